//! Snapshot port — durable copy of the sensor store.

use domintell_domain::device::Device;
use domintell_domain::error::DomintellError;

/// Persists the full device set.
///
/// Calls are synchronous: the engine writes the snapshot before it fires
/// the alerts for the change that triggered it.
pub trait SnapshotStore: Send + Sync {
    /// Load the last persisted device set.
    ///
    /// Implementations recover from a corrupt snapshot on their own and
    /// return an empty set when nothing usable is left.
    ///
    /// # Errors
    ///
    /// Returns [`DomintellError::Storage`] when the snapshot cannot be read
    /// at all.
    fn load(&self) -> Result<Vec<Device>, DomintellError>;

    /// Replace the persisted device set.
    ///
    /// # Errors
    ///
    /// Returns [`DomintellError::Storage`] when the write is skipped or fails.
    fn save(&self, devices: &[Device]) -> Result<(), DomintellError>;
}
