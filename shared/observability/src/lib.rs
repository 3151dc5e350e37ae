//! MemHub observability library.
//!
//! Standardized tracing subscriber setup for every MemHub service, so log
//! shape and filtering behave the same across the fleet.

pub mod init;

pub use init::*;

// Re-export tracing for convenience
pub use tracing::{debug, error, info, instrument, trace, warn};
