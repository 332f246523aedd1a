//! The caches owned by the Watcher Loop (§3): all process-local,
//! non-persistent, and mutated only under the processing lock.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::models::{
    INewsRundown, PlaylistId, ResolvedPlaylist, RundownId, SegmentId, SegmentRanking, UnrankedSegment,
};

/// All state the Watcher remembers between polls. `segments`, `rundowns`,
/// and `playlists` from spec.md §3 are views over `cached_assigned_rundowns`
/// / `cached_playlist_assignments` here rather than separate maps — they
/// are rebuilt from the same source every poll, so keeping one copy
/// avoids the two ever disagreeing.
#[derive(Debug, Default)]
pub struct WatcherState {
    pub i_news_data_cache: HashMap<SegmentId, UnrankedSegment>,
    pub cached_assigned_rundowns: HashMap<PlaylistId, Vec<INewsRundown>>,
    pub cached_playlist_assignments: HashMap<PlaylistId, ResolvedPlaylist>,
    pub previous_ranks: HashMap<RundownId, SegmentRanking>,
    pub last_forced_rank_recalculation: HashMap<RundownId, DateTime<Utc>>,
    pub skip_cache_for_rundown: HashSet<RundownId>,
}
