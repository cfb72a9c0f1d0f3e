use std::sync::Arc;

use log::trace;
use tokio::sync::watch;

/// Broadcasts "position changed" to every pipeline attempt subscribed at the time.
///
/// Built on a `watch` channel carrying a generation counter. Subscribers only
/// see generations published after they subscribed, and publishing with no
/// subscribers simply bumps the counter.
#[derive(Debug, Clone)]
pub struct SignalBus {
    tx: Arc<watch::Sender<u64>>,
}

impl SignalBus {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Notify all current subscribers
    pub fn publish(&self) {
        self.tx.send_modify(|generation| *generation = generation.wrapping_add(1));
        trace!(
            "Position change published to {} subscriber(s)",
            self.tx.receiver_count()
        );
    }

    /// Subscribe for one pipeline attempt. Earlier publications are not replayed.
    pub fn subscribe(&self) -> Subscription {
        let mut rx = self.tx.subscribe();
        rx.borrow_and_update();
        Subscription { rx, fired: false }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of the bus scoped to one attempt.
///
/// Once a publication is observed the subscription stays cancelled.
#[derive(Debug)]
pub struct Subscription {
    rx: watch::Receiver<u64>,
    fired: bool,
}

impl Subscription {
    /// Non-blocking check
    pub fn is_cancelled(&mut self) -> bool {
        if !self.fired {
            // A dropped bus can never deliver again, so treat it as a stop.
            self.fired = self.rx.has_changed().unwrap_or(true);
        }
        self.fired
    }

    /// Resolves once a publication arrives. Cancel-safe.
    pub async fn cancelled(&mut self) {
        if self.fired {
            return;
        }
        let _ = self.rx.changed().await;
        self.fired = true;
    }
}
