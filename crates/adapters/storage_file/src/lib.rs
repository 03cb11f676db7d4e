//! # domintell-adapter-storage-file
//!
//! File storage adapter — implements the `SnapshotStore` port on the local
//! filesystem.
//!
//! ## Responsibilities
//! - Select the encoding from the snapshot extension (`.bin` postcard, `.json`)
//! - Replace the snapshot atomically through a temporary file and a backup
//! - Recover from interrupted writes and corrupt files on load
//!
//! ## Dependency rule
//! Same as other adapters: depends on `domintell-app` (ports) and
//! `domintell-domain` (entities) only.

mod error;
mod file;
mod format;

pub use error::StorageError;
pub use file::FileSnapshotStore;
pub use format::SnapshotFormat;
