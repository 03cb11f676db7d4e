//! In-process event bus backed by a tokio broadcast channel.

use tokio::sync::broadcast;

use domintell_domain::error::DomintellError;

use crate::ports::{EventListener, SensorEvent};

/// [`EventListener`] that fans events out to async subscribers through a
/// tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the event is simply dropped).
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SensorEvent>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events on this bus.
    ///
    /// Returns a receiver that will get all events published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SensorEvent> {
        self.sender.subscribe()
    }
}

impl EventListener for EventBus {
    fn on_event(&self, event: &SensorEvent) -> Result<(), DomintellError> {
        // send only fails when nobody is subscribed
        let _ = self.sender.send(event.clone());
        Ok(())
    }
}
