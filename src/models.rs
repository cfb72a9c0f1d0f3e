use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::CommandError;

/// Number of queue entries shown around the current position
pub const QUEUE_WINDOW_SIZE: usize = 25;

/// Opaque handle the source provider resolves into a PCM stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SourceRef(String);

impl SourceRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One queued playable item. Immutable once enqueued.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub author: String,
    pub duration: Duration,
    pub source: SourceRef,
    pub requester: String,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
        duration: Duration,
        source: SourceRef,
        requester: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            duration,
            source,
            requester: requester.into(),
        }
    }

    /// Build a track for a local reference, using the file stem as title
    pub fn from_reference(reference: &str, requester: &str) -> Self {
        let title = std::path::Path::new(reference)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(reference)
            .to_string();

        Self::new(
            reference,
            title,
            "Unknown Artist",
            Duration::ZERO,
            SourceRef::new(reference),
            requester,
        )
    }

    /// Format duration as MM:SS
    pub fn duration_formatted(&self) -> String {
        let total_seconds = self.duration.as_secs();
        format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
    }
}

/// Advance policy applied when a track finishes naturally
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    Off,
    Song,
    Queue,
}

impl LoopMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopMode::Off => "off",
            LoopMode::Song => "song",
            LoopMode::Queue => "queue",
        }
    }

    /// Parse a loop command argument
    pub fn parse(arg: &str) -> Result<Self, CommandError> {
        match arg.trim().to_lowercase().as_str() {
            "off" => Ok(LoopMode::Off),
            "song" => Ok(LoopMode::Song),
            "queue" | "playlist" => Ok(LoopMode::Queue),
            other => Err(CommandError::invalid("loop", other, "off, song or queue")),
        }
    }

    /// The mode selected by a bare loop command
    pub fn cycled(self) -> Self {
        match self {
            LoopMode::Off => LoopMode::Song,
            LoopMode::Song => LoopMode::Queue,
            LoopMode::Queue => LoopMode::Off,
        }
    }
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Playback state enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
}

impl PlaybackState {
    /// Get a human-readable string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "Idle",
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
        }
    }

    /// Playing or Paused
    pub fn is_active(&self) -> bool {
        !matches!(self, PlaybackState::Idle)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of the session for status display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub state: PlaybackState,
    pub position: isize,
    pub queue_len: usize,
    pub current_track: Option<Track>,
    pub loop_mode: LoopMode,
    pub shuffle: bool,
    pub volume: f32,
    pub sink_attached: bool,
}

impl PlayerStatus {
    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlaybackState::Playing)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state, PlaybackState::Paused)
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, PlaybackState::Idle)
    }

    /// Volume as a whole percentage
    pub fn volume_percent(&self) -> u8 {
        (self.volume * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

impl Default for PlayerStatus {
    fn default() -> Self {
        Self {
            state: PlaybackState::Idle,
            position: -1,
            queue_len: 0,
            current_track: None,
            loop_mode: LoopMode::Off,
            shuffle: false,
            volume: 1.0,
            sink_attached: false,
        }
    }
}

/// One row of a queue listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueEntry {
    pub index: usize,
    pub track: Track,
}

impl QueueEntry {
    /// Render as `NN. title | requester` with a 1-based index
    pub fn render(&self) -> String {
        format!("{:02}. {} | {}", self.index + 1, self.track.title, self.track.requester)
    }
}

/// Consistent copy of the queue taken under the store lock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueListing {
    pub entries: Vec<QueueEntry>,
    pub position: isize,
}

impl QueueListing {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries visible in a window of `size` rows anchored on the current position.
    ///
    /// Starts at the current track when enough entries follow it; otherwise the
    /// window is pulled back so it ends on the last entry.
    pub fn window(&self, size: usize) -> &[QueueEntry] {
        let len = self.entries.len();
        let anchor = self.position.max(0) as usize;

        let (start, end) = if len >= anchor + size {
            (anchor, anchor + size)
        } else {
            (len.saturating_sub(size), len)
        };

        &self.entries[start.min(len)..end]
    }

    /// Render the default window, one entry per line
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return "The queue is empty".to_string();
        }

        self.window(QUEUE_WINDOW_SIZE)
            .iter()
            .map(QueueEntry::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
