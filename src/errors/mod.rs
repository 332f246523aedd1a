//! Centralized error handling for the rundown watcher.
//!
//! Mirrors the error taxonomy from the design: NRCS fetch failures, cache
//! misses, rank-assignment failures, and gateway-version mismatches each
//! get their own variant so callers can match on *kind* rather than
//! string-matching messages.

pub mod types;

pub use types::*;

/// Convenience type alias for Results using [`AppError`].
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Results using [`NrcsError`].
pub type NrcsResult<T> = Result<T, NrcsError>;

/// Convenience type alias for Results using [`ControlPlaneError`].
pub type ControlPlaneResult<T> = Result<T, ControlPlaneError>;
