use log::debug;
use rand::Rng;

use crate::error::QueueError;
use crate::models::{LoopMode, QueueEntry, QueueListing, Track};
use crate::signal::SignalBus;

/// Position sentinel meaning "nothing selected"
pub const IDLE_POSITION: isize = -1;

/// Ordered track list plus the play-position pointer.
///
/// Every successful `set_position` publishes on the signal bus so that an
/// in-flight pipeline stops. Callers are expected to hold the session lock
/// around mutation, which makes the store update and the publication one step.
#[derive(Debug)]
pub struct QueueStore {
    tracks: Vec<Track>,
    position: isize,
    signals: SignalBus,
}

impl QueueStore {
    pub fn new(signals: SignalBus) -> Self {
        Self {
            tracks: Vec::new(),
            position: IDLE_POSITION,
            signals,
        }
    }

    /// Append a track and return its index
    pub fn enqueue(&mut self, track: Track) -> usize {
        debug!("Enqueued '{}' requested by {}", track.title, track.requester);
        self.tracks.push(track);
        self.tracks.len() - 1
    }

    /// Whether the next enqueue should be followed by selecting position 0
    pub fn needs_initial_selection(&self) -> bool {
        self.tracks.is_empty() && self.position == IDLE_POSITION
    }

    /// Empty the queue and reset the position. Does not publish.
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.position = IDLE_POSITION;
    }

    /// Move the pointer to `value` in `[0, len]` or to the idle sentinel.
    pub fn set_position(&mut self, value: isize) -> Result<(), QueueError> {
        let len = self.tracks.len();
        if value != IDLE_POSITION && !(0..=len as isize).contains(&value) {
            return Err(QueueError::OutOfRange { requested: value, len });
        }

        debug!("Queue position {} -> {}", self.position, value);
        self.position = value;
        self.signals.publish();
        Ok(())
    }

    /// Settle the transient "exhausted" position (`len`) to a real one.
    pub fn resolve_exhausted(&mut self, loop_mode: LoopMode) {
        let len = self.tracks.len() as isize;
        if self.position >= len {
            self.position = if loop_mode == LoopMode::Queue && len > 0 {
                0
            } else {
                IDLE_POSITION
            };
        }
    }

    /// Position to move to after the track at `current` finishes naturally
    pub fn next_for_completion<R: Rng + ?Sized>(
        &self,
        current: isize,
        loop_mode: LoopMode,
        shuffle: bool,
        rng: &mut R,
    ) -> isize {
        next_for_completion(current, self.tracks.len(), loop_mode, shuffle, rng)
    }

    pub fn position(&self) -> isize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn track_at(&self, position: isize) -> Option<&Track> {
        usize::try_from(position).ok().and_then(|i| self.tracks.get(i))
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.track_at(self.position)
    }

    /// Copy of the queue suitable for formatting outside the lock
    pub fn listing(&self) -> QueueListing {
        QueueListing {
            entries: self
                .tracks
                .iter()
                .enumerate()
                .map(|(index, track)| QueueEntry { index, track: track.clone() })
                .collect(),
            position: self.position,
        }
    }
}

/// Advance policy for natural completion.
///
/// Song loop replays. Shuffle picks uniformly among the other indices and
/// stays put when there are none. Otherwise step forward, wrapping only under
/// queue loop and going idle past the end.
pub fn next_for_completion<R: Rng + ?Sized>(
    current: isize,
    len: usize,
    loop_mode: LoopMode,
    shuffle: bool,
    rng: &mut R,
) -> isize {
    if loop_mode == LoopMode::Song {
        return current;
    }

    if shuffle {
        if len <= 1 {
            return current;
        }
        return match usize::try_from(current).ok().filter(|&c| c < len) {
            Some(current) => {
                let pick = rng.random_range(0..len - 1);
                (if pick >= current { pick + 1 } else { pick }) as isize
            }
            None => rng.random_range(0..len) as isize,
        };
    }

    if current + 1 < len as isize {
        current + 1
    } else if loop_mode == LoopMode::Queue {
        0
    } else {
        IDLE_POSITION
    }
}
