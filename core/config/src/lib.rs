//! In-memory remote configuration for Stratus.
//!
//! This module provides:
//! - Remote definitions (provider tag + opaque key/value settings)
//! - The process-wide in-memory configuration store
//! - Rendering and parsing of the mount helper's profile wire format
//!
//! # Design Principles
//! - RAM only: the store never touches persistent storage; serialized
//!   profiles exist solely to be piped into a helper's stdin
//! - Replace-by-name: re-adding a remote atomically replaces its block
//! - Secret hygiene: definitions and serialized output zeroize on drop

pub mod profile;
pub mod providers;
pub mod remote;
pub mod store;

pub use profile::{parse_profile, render_profile};
pub use providers::{ProviderInfo, PROVIDERS};
pub use remote::RemoteDefinition;
pub use store::ConfigStore;
