//! # domintell-app
//!
//! Application layer — the gateway engine and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `Connector` / `Link` — open and use a datagram link to the gateway
//!   - `SnapshotStore` — load & save the device set
//!   - `EventListener` — receive `sensor_update` notifications
//! - Own the live **sensor store** and apply decoded frames to it
//! - Run the **connection lifecycle** (login, inventory, keepalive, reconnect)
//! - Serialise deferred work through the FIFO **command queue**
//! - Expose the collaborator interface (`GatewayHandle`: query, set value, stop)
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `domintell-domain` only (plus `tokio` for tasks, channels and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod config;
pub mod connection;
pub mod event_bus;
pub mod gateway;
pub mod lines;
pub mod ports;
pub mod queue;
pub mod sensor_store;

#[cfg(test)]
mod testing;
