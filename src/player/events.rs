use log::trace;
use tokio::sync::broadcast;

use crate::audio::PipelineOutcome;
use crate::models::Track;

/// Announcements for whoever renders playback to users
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    TrackStarted { position: isize, track: Track },
    TrackFinished { position: isize, outcome: PipelineOutcome },
    PositionChanged { position: isize },
    /// Natural completion ran off the end with no loop
    QueueFinished,
    /// The transport went away; playback waits for a new sink
    SinkLost,
}

/// Lossy fan-out of [`PlayerEvent`]s
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<PlayerEvent>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Send to every listener, ignoring the case of no listeners
    pub fn broadcast_lossy(&self, event: PlayerEvent) {
        trace!("Event {:?} to {} listener(s)", event, self.tx.receiver_count());
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
