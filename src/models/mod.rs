//! Core data model for the rundown watcher.
//!
//! These types mirror the entities described for the watcher subsystem:
//! opaque identifiers, the per-poll resolved playlist shape, and the
//! per-rundown snapshot the differ compares against. Nothing here is
//! persisted; every value is reconstructed each poll from the NRCS and
//! control-plane collaborators.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod ids;
pub mod rank;

pub use ids::{PlaylistId, RundownId, SegmentId};
pub use rank::Rank;

/// A story as returned by the NRCS, with its body fetched.
///
/// `i_news_story` is intentionally opaque: the differ and resolver must
/// not interpret it beyond the single introspected `meta.float` flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnrankedSegment {
    pub segment_id: SegmentId,
    /// The rundown this segment currently belongs to, as last resolved.
    pub rundown_id: RundownId,
    pub name: String,
    pub modified: DateTime<Utc>,
    /// Opaque version token advanced by the NRCS whenever the body changes.
    pub locator: String,
    pub i_news_story: INewsStory,
}

/// Opaque story payload. Treated as a blob except for `meta.float` and
/// whatever field the configured [`crate::resolver::RundownBoundaryDetector`]
/// inspects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct INewsStory {
    pub meta: StoryMeta,
    /// Opaque body content, never interpreted by the core.
    #[serde(default)]
    pub body: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoryMeta {
    #[serde(default)]
    pub float: bool,
    /// Marker inspected by the default [`crate::resolver::RundownBoundaryDetector`]
    /// to decide whether this story starts a new rundown.
    #[serde(default)]
    pub rundown_start: bool,
    /// Absolute clock target, propagated as a rundown's `backTime` when
    /// present on a rundown-starting story.
    #[serde(default)]
    pub back_time: Option<DateTime<Utc>>,
}

/// A segment as listed by `downloadRundown`, before its body is fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReducedSegment {
    pub segment_id: SegmentId,
    pub name: String,
    pub modified: DateTime<Utc>,
    pub rank: Rank,
    pub locator: String,
}

/// The full segment listing for one NRCS queue, as returned by
/// `downloadRundown`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReducedRundown {
    pub gateway_version: String,
    pub segments: Vec<ReducedSegment>,
}

/// One rundown within a resolved playlist: its id, the ordered segment
/// ids assigned to it, and an optional propagated back time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ResolvedRundown {
    pub rundown_id: RundownId,
    pub segment_ids: Vec<SegmentId>,
    pub back_time: Option<DateTime<Utc>>,
}

/// Output of the Playlist Resolver: the ordered partition of one queue's
/// stories into one or more rundowns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ResolvedPlaylist {
    pub playlist_id: PlaylistId,
    pub rundowns: Vec<ResolvedRundown>,
}

/// A fully materialized segment within an `INewsRundown`: resolved
/// ordering plus the fetched story body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RundownSegment {
    pub segment_id: SegmentId,
    pub name: String,
    pub modified: DateTime<Utc>,
    pub rank: Rank,
    pub locator: String,
    pub i_news_story: INewsStory,
}

/// Per-poll derived value passed to the Differ: one rundown's identity,
/// ordered segments, and gateway version tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct INewsRundown {
    pub rundown_id: RundownId,
    pub name: String,
    pub gateway_version: String,
    pub segments: Vec<RundownSegment>,
    pub back_time: Option<DateTime<Utc>>,
}

impl INewsRundown {
    pub fn segment_ids(&self) -> impl Iterator<Item = &SegmentId> {
        self.segments.iter().map(|s| &s.segment_id)
    }

    pub fn find_segment(&self, id: &SegmentId) -> Option<&RundownSegment> {
        self.segments.iter().find(|s| &s.segment_id == id)
    }
}

/// Per-rundown mapping of segment to assigned rank, as maintained by the
/// Rank Assigner across polls for stability.
pub type SegmentRanking = HashMap<SegmentId, Rank>;
