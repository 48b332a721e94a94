//! Mount session management for Stratus.
//!
//! This module provides:
//! - The drive-letter pool that hands out local mount-point identifiers
//! - The `MountHelper` seam over the external mount tool, with the real
//!   `RcloneHelper` and an in-process `FakeHelper` double
//! - Platform-appropriate forceful process termination
//! - The `SessionManager` that owns every live mount session
//!
//! # Architecture
//! The session manager is injected with the configuration store and a
//! helper implementation; it never reaches for ambient global state. One
//! remote name maps to at most one live helper process, enforced by a
//! per-name lock around mount/unmount.

pub mod fake;
pub mod helper;
pub mod letters;
pub mod manager;
pub mod terminate;

pub use fake::{FakeHelper, FakeProcess};
pub use helper::{AuthorizeOutcome, HelperProcess, MountHelper, RcloneHelper};
pub use letters::{LetterPool, DEFAULT_RESERVED};
pub use manager::{MountSession, SessionManager};
pub use terminate::{platform_terminator, Terminate};
