//! The Watcher's outward event stream (§4.5): the only channel by
//! which the rest of the process observes what one poll cycle found.

use crate::models::{INewsRundown, RundownId, RundownSegment, SegmentId, SegmentRanking};

#[derive(Debug, Clone)]
pub enum WatcherEvent {
    Info(String),
    Warning(String),
    Error(String),
    RundownCreate {
        rundown_id: RundownId,
        rundown: INewsRundown,
    },
    RundownUpdate {
        rundown_id: RundownId,
        rundown: INewsRundown,
    },
    RundownDelete {
        rundown_id: RundownId,
    },
    SegmentCreate {
        rundown_id: RundownId,
        segment_id: SegmentId,
        segment: RundownSegment,
    },
    SegmentUpdate {
        rundown_id: RundownId,
        segment_id: SegmentId,
        segment: RundownSegment,
    },
    SegmentDelete {
        rundown_id: RundownId,
        segment_id: SegmentId,
    },
    SegmentRanksUpdate {
        rundown_id: RundownId,
        ranks: SegmentRanking,
    },
}

impl WatcherEvent {
    /// Short kind name, used for the `events_emitted` metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            WatcherEvent::Info(_) => "info",
            WatcherEvent::Warning(_) => "warning",
            WatcherEvent::Error(_) => "error",
            WatcherEvent::RundownCreate { .. } => "rundown_create",
            WatcherEvent::RundownUpdate { .. } => "rundown_update",
            WatcherEvent::RundownDelete { .. } => "rundown_delete",
            WatcherEvent::SegmentCreate { .. } => "segment_create",
            WatcherEvent::SegmentUpdate { .. } => "segment_update",
            WatcherEvent::SegmentDelete { .. } => "segment_delete",
            WatcherEvent::SegmentRanksUpdate { .. } => "segment_ranks_update",
        }
    }
}
