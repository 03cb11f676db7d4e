//! Listener port — notifications about device value changes.

use std::fmt;

use domintell_domain::error::DomintellError;
use domintell_domain::id::DeviceId;

/// Something a collaborator may want to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorEvent {
    /// The value of a device record changed.
    SensorUpdate { device_id: DeviceId },
}

impl SensorEvent {
    /// Stable name of the event kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SensorUpdate { .. } => "sensor_update",
        }
    }

    #[must_use]
    pub fn device_id(&self) -> &DeviceId {
        match self {
            Self::SensorUpdate { device_id } => device_id,
        }
    }
}

impl fmt::Display for SensorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.kind(), self.device_id().as_str())
    }
}

/// Receives [`SensorEvent`]s synchronously on the engine task.
///
/// A failing or panicking listener is logged and skipped; it never stops
/// the engine or the other listeners.
pub trait EventListener: Send + Sync {
    /// Handle one event.
    ///
    /// # Errors
    ///
    /// Any error is logged by the engine and otherwise ignored.
    fn on_event(&self, event: &SensorEvent) -> Result<(), DomintellError>;
}

impl<F> EventListener for F
where
    F: Fn(&SensorEvent) + Send + Sync,
{
    fn on_event(&self, event: &SensorEvent) -> Result<(), DomintellError> {
        self(event);
        Ok(())
    }
}
