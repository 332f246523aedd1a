//! Control-plane client (§6): status reporting, the previously-ingested
//! segment cache, and the dynamic settings reload stream.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::Stream;

use crate::config::Config;
use crate::errors::ControlPlaneResult;
use crate::models::{RundownId, RundownSegment, SegmentId};

pub mod http;
pub mod reload;

pub use http::HttpControlPlaneClient;
pub use reload::FilePollingConfigSource;

/// Gateway health as reported to the control plane after each poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Good,
    WarningMajor,
    WarningMinor,
}

impl StatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Good => "GOOD",
            StatusCode::WarningMajor => "WARNING_MAJOR",
            StatusCode::WarningMinor => "WARNING_MINOR",
        }
    }
}

/// Consumed interface to the downstream playout control plane.
#[async_trait]
pub trait ControlPlaneClient: Send + Sync {
    /// Report this gateway's health after a poll cycle.
    async fn set_status(&self, code: StatusCode, messages: &[String]) -> ControlPlaneResult<()>;

    /// Fetch the control plane's previously-ingested view of the given
    /// stale segment ids for one rundown, used to avoid redundant
    /// create events after a restart.
    async fn get_segments_cache_by_id(
        &self,
        rundown_id: &RundownId,
        segment_ids: &[SegmentId],
    ) -> ControlPlaneResult<HashMap<SegmentId, RundownSegment>>;
}

/// Source of dynamic gateway settings (queue list, debug flag, poll
/// interval). In the system this gateway replaces, settings arrive via
/// an observable `peripheralDevices` collection; here it is modeled as
/// a trait so a file-polling default can stand in for a real
/// control-plane subscription.
pub trait ConfigSource: Send + Sync {
    /// A stream that yields a new [`Config`] every time settings change.
    /// Implementations should yield the current config once immediately
    /// so a fresh [`crate::watcher::Watcher`] can be built without a
    /// separate initial load.
    fn watch(&self) -> std::pin::Pin<Box<dyn Stream<Item = Config> + Send>>;
}
