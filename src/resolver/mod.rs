//! Playlist Resolver (§4.2): partitions one queue's ordered stories into
//! one or more logical rundowns based on an in-content boundary marker.
//!
//! Pure function, no network or cache access — everything it needs is
//! passed in.

use crate::models::{PlaylistId, ResolvedPlaylist, ResolvedRundown, SegmentId, UnrankedSegment};

/// Decides whether a story starts a new rundown. The source system
/// leaves this detection to a helper that isn't specified further, so
/// it's exposed here as a hook rather than baked into the resolver.
pub trait RundownBoundaryDetector: Send + Sync {
    fn is_rundown_start(&self, story: &UnrankedSegment) -> bool;
}

/// Default detector: treats `meta.rundown_start` on the opaque story
/// payload as the boundary marker.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkerFieldBoundaryDetector;

impl RundownBoundaryDetector for MarkerFieldBoundaryDetector {
    fn is_rundown_start(&self, story: &UnrankedSegment) -> bool {
        story.i_news_story.meta.rundown_start
    }
}

/// Partition `segments` (in queue order) into one or more rundowns
/// under `playlist_id`, per spec rules:
///
/// 1. A boundary-marked story starts a new rundown.
/// 2. Rundowns are numbered `${playlist_id}_1`, `_2`, ... in order of
///    first appearance.
/// 3. If nothing partitions, emit one empty rundown `${playlist_id}_1`.
/// 4. `back_time` on the *last* rundown-starting story in a rundown is
///    propagated as that rundown's `back_time`.
pub fn resolve_playlist(
    playlist_id: &PlaylistId,
    segments: &[UnrankedSegment],
    boundary: &dyn RundownBoundaryDetector,
) -> ResolvedPlaylist {
    let mut rundowns: Vec<ResolvedRundown> = Vec::new();
    let mut ordinal = 0usize;

    for story in segments {
        let starts_new = ordinal == 0 || boundary.is_rundown_start(story);
        if starts_new {
            ordinal += 1;
            rundowns.push(ResolvedRundown {
                rundown_id: playlist_id.rundown_id(ordinal),
                segment_ids: Vec::new(),
                back_time: None,
            });
        }

        let current = rundowns.last_mut().expect("seeded above");
        current.segment_ids.push(story.segment_id.clone());
        if boundary.is_rundown_start(story) {
            current.back_time = story.i_news_story.meta.back_time;
        }
    }

    if rundowns.is_empty() {
        rundowns.push(ResolvedRundown {
            rundown_id: playlist_id.rundown_id(1),
            segment_ids: Vec::<SegmentId>::new(),
            back_time: None,
        });
    }

    ResolvedPlaylist {
        playlist_id: playlist_id.clone(),
        rundowns,
    }
}
