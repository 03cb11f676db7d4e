//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the gateway engine and the outside world.
//! They are defined here (in `app`) so that both the engine and the adapter
//! crates can depend on them without creating circular dependencies.

pub mod listener;
pub mod snapshot;
pub mod transport;

pub use listener::{EventListener, SensorEvent};
pub use snapshot::SnapshotStore;
pub use transport::{Connector, Link};
