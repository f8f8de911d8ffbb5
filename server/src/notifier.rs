//! Best-effort fan-out of game events to observers.
//!
//! Publishing never blocks and never fails: events go out on a tokio
//! broadcast channel, at most once, with no replay. A receiver only sees
//! what was published after it subscribed; one that falls behind by more
//! than the channel capacity skips the oldest events.

use log::debug;
use shared::GameEvent;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct Notifier {
    sender: broadcast::Sender<GameEvent>,
}

impl Notifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: GameEvent) {
        let kind = event.kind();
        // Err only means nobody is listening right now
        match self.sender.send(event) {
            Ok(receivers) => debug!("Published {} to {} observers", kind, receivers),
            Err(_) => debug!("Published {} with no observers", kind),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.sender.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
