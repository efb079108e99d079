//! Change notifications.
//!
//! Consumers are told *that* something changed, never *what*: they re-query
//! the source of truth after every notification.

use tokio::sync::broadcast;

const CHANGE_BUFFER: usize = 64;

/// Fan-out notifier backed by a broadcast channel.
///
/// A lagging receiver only loses intermediate notifications, which is
/// harmless because every event means "re-query".
#[derive(Debug)]
pub struct ChangeNotifier<T: Clone> {
    sender: broadcast::Sender<T>,
}

impl<T: Clone> ChangeNotifier<T> {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANGE_BUFFER);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }

    /// Fire an event. Having no subscribers is not an error.
    pub fn notify(&self, event: T) {
        let _ = self.sender.send(event);
    }
}

impl<T: Clone> Default for ChangeNotifier<T> {
    fn default() -> Self {
        Self::new()
    }
}
