//! # domintell-domain
//!
//! Pure domain model for talking to a Domintell home-automation gateway.
//!
//! ## Responsibilities
//! - Foundational types: typed device identifiers, error conventions, timestamps
//! - Define the **module catalog** (`IS8`, `BU4`, `DIM`, … and their channel layout)
//! - Define **Devices** (one record per addressable channel, plus the clock)
//! - Decode received lines into typed **Frames**
//! - Render outgoing **Commands** (`LOGIN`, `APPINFO`, `PING`, switch on/off)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;

pub mod command;
pub mod device;
pub mod frame;
pub mod module;
