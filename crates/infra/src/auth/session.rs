use photox_core::{SessionEndReason, SessionObserver};
use tokio::sync::broadcast;
use tracing::warn;

const CHANNEL_CAPACITY: usize = 16;

/// Default session observer.
///
/// Logs the teardown and broadcasts it so a UI layer can navigate to the
/// login screen. Having no subscribers is fine.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEndReason>,
}

impl SessionEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEndReason> {
        self.sender.subscribe()
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionObserver for SessionEvents {
    fn session_ended(&self, reason: SessionEndReason) {
        warn!(%reason, "Session ended, redirecting to login");
        let _ = self.sender.send(reason);
    }
}
