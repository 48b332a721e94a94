//! Application facade for Stratus.
//!
//! This module provides:
//! - The `Mounter` facade, the single API surface presentation layers call
//! - Presentation-neutral status values delivered over a single-consumer
//!   channel drained by the UI loop
//! - A bounded command queue with a fixed set of worker tasks, so no
//!   blocking operation ever runs on the UI's thread of control
//!
//! # Architecture
//! The facade performs no business logic beyond sequencing calls into the
//! configuration store and the session manager and translating results
//! into status values.

pub mod mounter;
pub mod status;

pub use mounter::Mounter;
pub use status::{MountStatus, RemoteInfo, StatusEvent};
