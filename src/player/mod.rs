pub mod events;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info};
use tokio::sync::{broadcast, watch, Notify};
use tokio::task::JoinHandle;

use crate::audio::{
    AudioPipeline, EncoderFactory, PipelineContext, PipelineOutcome, SourceProvider,
    TransportSink, VolumeControl,
};
use crate::error::{CommandError, QueueError};
use crate::logging::PlaybackLogger;
use crate::models::{LoopMode, PlaybackState, PlayerStatus, QueueListing, Track};
use crate::queue::{QueueStore, IDLE_POSITION};
use crate::signal::SignalBus;

pub use events::{EventBroadcaster, PlayerEvent};

const EVENT_CAPACITY: usize = 64;

/// What a bare `play` command did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayAction {
    Resumed,
    Started,
    Nothing,
}

/// Mutable session state. Only the controller touches it, always under one lock.
struct SessionState {
    queue: QueueStore,
    loop_mode: LoopMode,
    shuffle: bool,
    playback: PlaybackState,
    sink: Option<Arc<dyn TransportSink>>,
    shutdown: bool,
}

struct Shared {
    state: Mutex<SessionState>,
    wake: Notify,
    signals: SignalBus,
    volume: VolumeControl,
    paused: watch::Sender<bool>,
    context: PipelineContext,
    events: EventBroadcaster,
    logger: PlaybackLogger,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_paused(&self, paused: bool) {
        self.paused.send_replace(paused);
    }
}

/// Everything the supervisor captured when it started an attempt
struct Attempt {
    position: isize,
    track: Track,
    sink: Arc<dyn TransportSink>,
    pipeline: AudioPipeline,
}

/// Owns the playback lifecycle of one session.
///
/// A single supervisor task starts at most one [`AudioPipeline`] at a time and
/// applies the advance policy when it finishes. Commands are synchronous and
/// only hold the session lock briefly.
pub struct PlaybackController {
    shared: Arc<Shared>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl PlaybackController {
    /// Create a controller and spawn its supervisor on the current runtime
    pub fn new(
        provider: Arc<dyn SourceProvider>,
        encoder: Arc<dyn EncoderFactory>,
        volume: f32,
    ) -> Self {
        Self::with_logger(provider, encoder, volume, PlaybackLogger::new())
    }

    pub fn with_logger(
        provider: Arc<dyn SourceProvider>,
        encoder: Arc<dyn EncoderFactory>,
        volume: f32,
        logger: PlaybackLogger,
    ) -> Self {
        let signals = SignalBus::new();
        let volume = VolumeControl::new(volume);
        let (paused, paused_rx) = watch::channel(false);

        let context = PipelineContext {
            provider,
            encoder,
            volume: volume.clone(),
            paused: paused_rx,
            logger: logger.clone(),
        };

        let shared = Arc::new(Shared {
            state: Mutex::new(SessionState {
                queue: QueueStore::new(signals.clone()),
                loop_mode: LoopMode::Off,
                shuffle: false,
                playback: PlaybackState::Idle,
                sink: None,
                shutdown: false,
            }),
            wake: Notify::new(),
            signals,
            volume,
            paused,
            context,
            events: EventBroadcaster::new(EVENT_CAPACITY),
            logger,
        });

        let supervisor = tokio::spawn(supervise(Arc::clone(&shared)));
        Self {
            shared,
            supervisor: Mutex::new(Some(supervisor)),
        }
    }

    /// Append a track, selecting it when the session was idle with an empty queue.
    /// Returns the track's index.
    pub fn enqueue(&self, track: Track) -> usize {
        let mut state = self.shared.lock();
        let select = state.queue.needs_initial_selection();
        let index = state.queue.enqueue(track);

        if select && state.queue.set_position(0).is_ok() {
            self.position_changed(&mut state, IDLE_POSITION);
        }
        index
    }

    /// Move to `position`, interrupting the current attempt
    pub fn set_position(&self, position: isize) -> Result<(), QueueError> {
        let mut state = self.shared.lock();
        let previous = state.queue.position();
        state.queue.set_position(position)?;
        self.position_changed(&mut state, previous);
        Ok(())
    }

    /// Jump to a 1-based track number
    pub fn jump(&self, track_number: usize) -> Result<(), QueueError> {
        let len = self.shared.lock().queue.len();
        if len == 0 {
            return Err(QueueError::EmptyQueue);
        }
        if track_number == 0 || track_number > len {
            return Err(QueueError::OutOfRange {
                requested: track_number as isize - 1,
                len,
            });
        }
        self.set_position(track_number as isize - 1)
    }

    /// Advance to the next physical index regardless of loop or shuffle.
    /// Returns the resulting position, or `None` when idle.
    pub fn skip(&self) -> Option<isize> {
        let mut state = self.shared.lock();
        let current = state.queue.position();
        if current == IDLE_POSITION {
            return None;
        }

        if state.queue.set_position(current + 1).is_err() {
            return None;
        }
        self.position_changed(&mut state, current);
        Some(state.queue.position())
    }

    /// Go idle, keeping the queue
    pub fn stop(&self) {
        let mut state = self.shared.lock();
        let previous = state.queue.position();
        if state.queue.set_position(IDLE_POSITION).is_ok() {
            self.position_changed(&mut state, previous);
        }
    }

    /// Empty the queue and go idle. Loop, shuffle and volume survive.
    pub fn clear(&self) {
        let mut state = self.shared.lock();
        let previous = state.queue.position();
        state.queue.clear();
        if state.queue.set_position(IDLE_POSITION).is_ok() {
            self.position_changed(&mut state, previous);
        }
    }

    /// Returns true if playback was paused by this call
    pub fn pause(&self) -> bool {
        let mut state = self.shared.lock();
        if state.playback != PlaybackState::Playing {
            return false;
        }
        state.playback = PlaybackState::Paused;
        self.shared.set_paused(true);
        self.shared.logger.log_paused();
        true
    }

    /// Returns true if playback was resumed by this call
    pub fn resume(&self) -> bool {
        let mut state = self.shared.lock();
        if state.playback != PlaybackState::Paused {
            return false;
        }
        state.playback = PlaybackState::Playing;
        self.shared.set_paused(false);
        self.shared.logger.log_resumed();
        true
    }

    /// Resume if paused, otherwise start from the top when idle
    pub fn play(&self) -> PlayAction {
        if self.resume() {
            return PlayAction::Resumed;
        }

        let mut state = self.shared.lock();
        if state.queue.position() != IDLE_POSITION || state.queue.is_empty() {
            return PlayAction::Nothing;
        }
        match state.queue.set_position(0) {
            Ok(()) => {
                self.position_changed(&mut state, IDLE_POSITION);
                PlayAction::Started
            }
            Err(_) => PlayAction::Nothing,
        }
    }

    pub fn set_loop_mode(&self, mode: LoopMode) -> LoopMode {
        self.shared.lock().loop_mode = mode;
        info!("Loop mode set to {}", mode);
        mode
    }

    /// Off -> Song -> Queue -> Off
    pub fn cycle_loop_mode(&self) -> LoopMode {
        let mode = {
            let mut state = self.shared.lock();
            state.loop_mode = state.loop_mode.cycled();
            state.loop_mode
        };
        info!("Loop mode set to {}", mode);
        mode
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.shared.lock().loop_mode
    }

    pub fn set_shuffle(&self, shuffle: bool) -> bool {
        self.shared.lock().shuffle = shuffle;
        info!("Shuffle {}", if shuffle { "on" } else { "off" });
        shuffle
    }

    pub fn toggle_shuffle(&self) -> bool {
        let shuffle = {
            let mut state = self.shared.lock();
            state.shuffle = !state.shuffle;
            state.shuffle
        };
        info!("Shuffle {}", if shuffle { "on" } else { "off" });
        shuffle
    }

    pub fn shuffle(&self) -> bool {
        self.shared.lock().shuffle
    }

    /// Set the linear volume; takes effect on the next frame
    pub fn set_volume(&self, volume: f32) -> Result<f32, CommandError> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(CommandError::invalid("volume", volume.to_string(), "a value between 0.0 and 1.0"));
        }
        self.shared.volume.set(volume);
        info!("Volume set to {:.2}", volume);
        Ok(volume)
    }

    pub fn volume(&self) -> f32 {
        self.shared.volume.get()
    }

    /// Install a transport. Returns false if one is already attached.
    pub fn attach_sink(&self, sink: Arc<dyn TransportSink>) -> bool {
        let mut state = self.shared.lock();
        if state.sink.is_some() {
            return false;
        }
        state.sink = Some(sink);
        self.shared.wake.notify_one();
        info!("Transport attached");
        true
    }

    /// Remove the transport. An active attempt keeps its own handle until it ends.
    pub fn detach_sink(&self) -> bool {
        let detached = self.shared.lock().sink.take().is_some();
        if detached {
            info!("Transport detached");
        }
        detached
    }

    /// Stop and drop the transport
    pub fn leave(&self) {
        self.stop();
        self.detach_sink();
    }

    pub fn status(&self) -> PlayerStatus {
        let state = self.shared.lock();
        PlayerStatus {
            state: state.playback,
            position: state.queue.position(),
            queue_len: state.queue.len(),
            current_track: state.queue.current_track().cloned(),
            loop_mode: state.loop_mode,
            shuffle: state.shuffle,
            volume: self.shared.volume.get(),
            sink_attached: state.sink.is_some(),
        }
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.shared.lock().playback
    }

    pub fn position(&self) -> isize {
        self.shared.lock().queue.position()
    }

    /// Snapshot for display, taken under the lock and formatted outside it
    pub fn listing(&self) -> QueueListing {
        self.shared.lock().queue.listing()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.shared.events.subscribe()
    }

    pub fn logger(&self) -> PlaybackLogger {
        self.shared.logger.clone()
    }

    /// Stop playback and wait for the supervisor to exit
    pub async fn shutdown(&self) {
        self.request_shutdown();

        let handle = self
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Playback supervisor ended abnormally: {}", e);
            }
        }
        info!("Playback controller shut down");
    }

    fn request_shutdown(&self) {
        let mut state = self.shared.lock();
        state.shutdown = true;
        let previous = state.queue.position();
        if state.queue.set_position(IDLE_POSITION).is_ok() {
            self.position_changed(&mut state, previous);
        }
    }

    /// Common tail of every position change: settle `len`, drop a stale
    /// pause, announce, and wake the supervisor.
    fn position_changed(&self, state: &mut SessionState, previous: isize) {
        state.queue.resolve_exhausted(state.loop_mode);
        self.shared.set_paused(false);
        if state.playback == PlaybackState::Paused {
            state.playback = PlaybackState::Playing;
        }

        let position = state.queue.position();
        self.shared.logger.log_position_changed(previous, position);
        self.shared
            .events
            .broadcast_lossy(PlayerEvent::PositionChanged { position });
        self.shared.wake.notify_one();
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.request_shutdown();
    }
}

/// Supervisor loop: start an attempt whenever a track is selected and none is
/// playing, then apply the outcome.
async fn supervise(shared: Arc<Shared>) {
    debug!("Playback supervisor started");
    loop {
        let attempt = match begin_attempt(&shared) {
            Ok(attempt) => attempt,
            Err(Shutdown) => break,
        };

        let Some(attempt) = attempt else {
            shared.wake.notified().await;
            continue;
        };

        let Attempt {
            position,
            track,
            sink,
            pipeline,
        } = attempt;
        let started = std::time::Instant::now();

        let outcome = match tokio::spawn(pipeline.run()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Pipeline for '{}' failed: {}", track.title, e);
                PipelineOutcome::Completed
            }
        };

        finish_attempt(&shared, position, &track, &sink, outcome, started.elapsed());
    }
    debug!("Playback supervisor stopped");
}

struct Shutdown;

/// Decide whether to start an attempt. Runs entirely under the session lock.
fn begin_attempt(shared: &Shared) -> Result<Option<Attempt>, Shutdown> {
    let mut guard = shared.lock();
    let state = &mut *guard;
    if state.shutdown {
        return Err(Shutdown);
    }

    state.queue.resolve_exhausted(state.loop_mode);
    let position = state.queue.position();
    if position < 0 || state.playback != PlaybackState::Idle {
        return Ok(None);
    }
    let Some(sink) = state.sink.clone() else {
        return Ok(None);
    };
    let Some(track) = state.queue.track_at(position).cloned() else {
        return Ok(None);
    };

    // Subscribing under the lock means any later set_position reaches this attempt.
    let cancel = shared.signals.subscribe();
    let pipeline = AudioPipeline::new(&shared.context, sink.clone(), track.source.clone(), cancel);

    state.playback = if *shared.paused.borrow() {
        PlaybackState::Paused
    } else {
        PlaybackState::Playing
    };
    shared.logger.log_track_started(position, &track.title);
    shared.events.broadcast_lossy(PlayerEvent::TrackStarted {
        position,
        track: track.clone(),
    });

    Ok(Some(Attempt {
        position,
        track,
        sink,
        pipeline,
    }))
}

/// Apply an attempt's outcome. Runs entirely under the session lock.
fn finish_attempt(
    shared: &Shared,
    position: isize,
    track: &Track,
    sink: &Arc<dyn TransportSink>,
    outcome: PipelineOutcome,
    elapsed: std::time::Duration,
) {
    let mut guard = shared.lock();
    let state = &mut *guard;
    state.playback = PlaybackState::Idle;
    let mut follow_up = None;

    match outcome {
        PipelineOutcome::Completed => {
            shared.logger.log_track_completed(position, &track.title, elapsed);
            // A command that moved the pointer during the attempt wins.
            if state.queue.position() == position {
                let next = state.queue.next_for_completion(
                    position,
                    state.loop_mode,
                    state.shuffle,
                    &mut rand::rng(),
                );
                if state.queue.set_position(next).is_ok() {
                    state.queue.resolve_exhausted(state.loop_mode);
                    if state.queue.position() == IDLE_POSITION {
                        follow_up = Some(PlayerEvent::QueueFinished);
                    }
                }
            }
        }
        PipelineOutcome::Cancelled => {
            shared.logger.log_track_cancelled(position, &track.title);
        }
        PipelineOutcome::SinkUnavailable => {
            // Only the transport this attempt used is dropped; a replacement
            // attached meanwhile picks up the same position.
            if state.sink.as_ref().is_some_and(|current| same_sink(current, sink)) {
                state.sink = None;
                follow_up = Some(PlayerEvent::SinkLost);
            } else {
                debug!("Replaced transport closed after '{}'", track.title);
            }
        }
    }

    if state.queue.position() == IDLE_POSITION {
        shared.set_paused(false);
    }

    shared.events.broadcast_lossy(PlayerEvent::TrackFinished { position, outcome });
    if let Some(event) = follow_up {
        shared.events.broadcast_lossy(event);
    }
}

fn same_sink(a: &Arc<dyn TransportSink>, b: &Arc<dyn TransportSink>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
