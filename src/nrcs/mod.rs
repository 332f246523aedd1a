//! NRCS Adapter (§4.1): download a queue listing, fetch story bodies by
//! id, and report in-flight queue length. The core does not retry at
//! this layer — a failed fetch is logged and the rundown is skipped for
//! the current poll; the next poll reconstructs truth.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::NrcsResult;
use crate::models::{ReducedRundown, SegmentId, UnrankedSegment};

pub mod http;

pub use http::HttpNrcsClient;

/// Consumed interface to the newsroom computer system. Implementations
/// are expected to reuse a bounded connection pool internally.
#[async_trait]
pub trait NrcsClient: Send + Sync {
    /// Download the segment listing for one queue.
    async fn download_rundown(&self, queue_id: &str) -> NrcsResult<ReducedRundown>;

    /// Fetch the full story body for a set of segment ids.
    async fn fetch_stories_by_id(
        &self,
        queue_id: &str,
        segment_ids: &[SegmentId],
    ) -> NrcsResult<HashMap<SegmentId, UnrankedSegment>>;

    /// Current in-flight request count against the NRCS. The watcher
    /// logs a warning, but takes no corrective action, when this is
    /// nonzero right after a poll completes (§9 Open Question (b)).
    async fn queue_length(&self) -> usize;
}
