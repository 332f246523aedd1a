//! Error type definitions.
//!
//! Follows the teacher crate's layering convention: focused error enums
//! per collaborator (`NrcsError`, `ControlPlaneError`), wrapped into one
//! top-level [`AppError`] via `#[from]` so call sites that don't care
//! about the distinction can just use `?`.

use thiserror::Error;

use crate::models::{RundownId, SegmentId};

/// Top-level application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// NRCS download or story fetch failed. The poll cycle logs this,
    /// skips the affected rundown, reports `WARNING_MAJOR`, and leaves
    /// previous caches untouched.
    #[error("NRCS fetch failed: {0}")]
    FetchFailure(#[from] NrcsError),

    /// Control-plane interaction failed (status report, cache fetch, or
    /// the settings-reload watch).
    #[error("control plane error: {0}")]
    ControlPlane(#[from] ControlPlaneError),

    /// An expected story went missing from cache after fetch. The
    /// affected segment is dropped from this poll's emission; other
    /// segments proceed.
    #[error("cache miss for segment {segment_id} in rundown {rundown_id}")]
    CacheMiss {
        rundown_id: RundownId,
        segment_id: SegmentId,
    },

    /// The ranker returned no rank for a required segment. The segment
    /// is still emitted, with its old rank if known else rank 0.
    #[error("rank assignment failed for segment {segment_id} in rundown {rundown_id}")]
    RankAssignmentFailure {
        rundown_id: RundownId,
        segment_id: SegmentId,
    },

    /// A downloaded rundown's `gatewayVersion` does not match this
    /// gateway's configured version. Silently skipped by the caller;
    /// this variant exists so it can still be logged at debug level.
    #[error("gateway version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },

    /// Configuration could not be loaded or was invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Generic internal error for conditions that should not occur.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration(message.into())
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }
}

/// Errors from the NRCS adapter (§4.1): downloading a queue listing or
/// fetching story bodies.
#[derive(Error, Debug)]
pub enum NrcsError {
    #[error("timed out contacting NRCS for queue {queue_id}")]
    Timeout { queue_id: String },

    #[error("NRCS request failed for queue {queue_id}: {message}")]
    RequestFailed { queue_id: String, message: String },

    #[error("NRCS returned malformed data for queue {queue_id}: {message}")]
    MalformedResponse { queue_id: String, message: String },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors from the control-plane client (§6): status reporting and the
/// previously-ingested segment cache lookup.
#[derive(Error, Debug)]
pub enum ControlPlaneError {
    #[error("failed to report status to control plane: {0}")]
    StatusReportFailed(String),

    #[error("failed to fetch segment cache for rundown {rundown_id}: {message}")]
    CacheFetchFailed {
        rundown_id: RundownId,
        message: String,
    },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
}
