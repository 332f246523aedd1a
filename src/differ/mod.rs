//! Playlist Differ (§4.4): pure, stateless diff between two snapshots
//! of one playlist's resolved rundowns, producing an ordered change
//! list plus coalesced rank updates.

use std::collections::{HashMap, HashSet};

use crate::models::{INewsRundown, Rank, RundownId, RundownSegment, SegmentId};

#[derive(Debug, Clone, PartialEq)]
pub enum RundownChange {
    Created(INewsRundown),
    Updated(INewsRundown),
    Deleted(RundownId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SegmentChange {
    Created {
        rundown_id: RundownId,
        segment: RundownSegment,
    },
    Changed {
        rundown_id: RundownId,
        segment: RundownSegment,
    },
    Moved {
        rundown_id: RundownId,
        segment: RundownSegment,
    },
    Deleted {
        rundown_id: RundownId,
        segment_id: SegmentId,
    },
}

/// Result of diffing one playlist's old and new rundown snapshots,
/// already sequenced per the emission order the Watcher Loop requires:
/// deletes first, then rundown creates/updates, then the remaining
/// segment-level changes, with moved-segment rank updates coalesced
/// last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaylistDiff {
    pub rundown_changes: Vec<RundownChange>,
    pub segment_changes: Vec<SegmentChange>,
    /// One coalesced `segment_ranks_update` per rundown that has
    /// `SegmentMoved` segments not already covered by a rundown
    /// create/update.
    pub rank_updates: Vec<(RundownId, HashMap<SegmentId, Rank>)>,
}

pub fn diff_playlist(new: &[INewsRundown], old: &[INewsRundown]) -> PlaylistDiff {
    let new_by_id: HashMap<&RundownId, &INewsRundown> =
        new.iter().map(|r| (&r.rundown_id, r)).collect();
    let old_by_id: HashMap<&RundownId, &INewsRundown> =
        old.iter().map(|r| (&r.rundown_id, r)).collect();

    let mut diff = PlaylistDiff::default();

    // Step 1: RundownDeleted, then SegmentDeleted for its segments.
    for rundown in old {
        if !new_by_id.contains_key(&rundown.rundown_id) {
            diff.rundown_changes
                .push(RundownChange::Deleted(rundown.rundown_id.clone()));
        }
    }
    for rundown in old {
        if new_by_id.contains_key(&rundown.rundown_id) {
            continue;
        }
        for segment in &rundown.segments {
            diff.segment_changes.push(SegmentChange::Deleted {
                rundown_id: rundown.rundown_id.clone(),
                segment_id: segment.segment_id.clone(),
            });
        }
    }

    // Segment-level deletes within rundowns that persist across both
    // snapshots: a segment absent from the new rundown it belonged to.
    for rundown in old {
        let Some(current) = new_by_id.get(&rundown.rundown_id) else {
            continue;
        };
        for segment in &rundown.segments {
            if current.find_segment(&segment.segment_id).is_none() {
                diff.segment_changes.push(SegmentChange::Deleted {
                    rundown_id: rundown.rundown_id.clone(),
                    segment_id: segment.segment_id.clone(),
                });
            }
        }
    }

    // Step 2: RundownCreated, then RundownUpdated.
    let mut fully_covered: HashSet<(RundownId, SegmentId)> = HashSet::new();
    for rundown in new {
        if !old_by_id.contains_key(&rundown.rundown_id) {
            diff.rundown_changes
                .push(RundownChange::Created(rundown.clone()));
            for segment in &rundown.segments {
                fully_covered.insert((rundown.rundown_id.clone(), segment.segment_id.clone()));
            }
        }
    }
    for rundown in new {
        let Some(previous) = old_by_id.get(&rundown.rundown_id) else {
            continue;
        };
        if rundown_updated(rundown, previous) {
            diff.rundown_changes
                .push(RundownChange::Updated(rundown.clone()));
            for segment in &rundown.segments {
                fully_covered.insert((rundown.rundown_id.clone(), segment.segment_id.clone()));
            }
        }
    }

    // Step 3: SegmentChanged, SegmentCreated, SegmentMoved for segments
    // not already covered by a containing rundown create/update.
    let all_old_segment_ids: HashSet<&SegmentId> = old
        .iter()
        .flat_map(|r| r.segments.iter().map(|s| &s.segment_id))
        .collect();

    let mut moved_by_rundown: HashMap<RundownId, HashMap<SegmentId, Rank>> = HashMap::new();

    for rundown in new {
        let previous = old_by_id.get(&rundown.rundown_id).copied();
        let moved_ids = previous
            .map(|previous| moved_segment_ids(&rundown.segments, &previous.segments))
            .unwrap_or_default();

        for segment in &rundown.segments {
            let key = (rundown.rundown_id.clone(), segment.segment_id.clone());
            if fully_covered.contains(&key) {
                continue;
            }

            let previous_segment = old_by_id
                .get(&rundown.rundown_id)
                .and_then(|r| r.find_segment(&segment.segment_id));

            match previous_segment {
                None if !all_old_segment_ids.contains(&segment.segment_id) => {
                    diff.segment_changes.push(SegmentChange::Created {
                        rundown_id: rundown.rundown_id.clone(),
                        segment: segment.clone(),
                    });
                }
                None => {
                    // Existed in old under a different rundown: a create
                    // here, a delete already recorded against the old
                    // rundown above.
                    diff.segment_changes.push(SegmentChange::Created {
                        rundown_id: rundown.rundown_id.clone(),
                        segment: segment.clone(),
                    });
                }
                Some(prev) if prev.locator != segment.locator => {
                    diff.segment_changes.push(SegmentChange::Changed {
                        rundown_id: rundown.rundown_id.clone(),
                        segment: segment.clone(),
                    });
                }
                Some(_) => {
                    if moved_ids.contains(&segment.segment_id) {
                        diff.segment_changes.push(SegmentChange::Moved {
                            rundown_id: rundown.rundown_id.clone(),
                            segment: segment.clone(),
                        });
                        moved_by_rundown
                            .entry(rundown.rundown_id.clone())
                            .or_default()
                            .insert(segment.segment_id.clone(), segment.rank);
                    }
                }
            }
        }
    }

    // Step 4: coalesce moved-segment rank updates per rundown.
    for (rundown_id, ranks) in moved_by_rundown {
        diff.rank_updates.push((rundown_id, ranks));
    }

    diff
}

/// A rundown-level update fires only for deltas that aren't already
/// expressible as segment-level events: a reorder is wholly captured by
/// `SegmentMoved`/coalesced rank updates, an insertion by `SegmentCreated`,
/// a removal by `SegmentDeleted` — so `backTime` is the only rundown-level
/// field left that can change without a corresponding segment event.
fn rundown_updated(new: &INewsRundown, old: &INewsRundown) -> bool {
    new.back_time != old.back_time
}

/// Segments whose relative order among their still-present peers changed
/// between `old` and `new`. Inserting or deleting a segment elsewhere in
/// the rundown shifts everyone else's raw array index without changing
/// their relative order, so this compares positions within the set of
/// segment ids common to both snapshots rather than raw indices.
fn moved_segment_ids(new: &[RundownSegment], old: &[RundownSegment]) -> HashSet<SegmentId> {
    let old_ids: HashSet<&SegmentId> = old.iter().map(|s| &s.segment_id).collect();
    let new_ids: HashSet<&SegmentId> = new.iter().map(|s| &s.segment_id).collect();

    let new_common: Vec<&SegmentId> = new
        .iter()
        .map(|s| &s.segment_id)
        .filter(|id| old_ids.contains(id))
        .collect();
    let old_common: Vec<&SegmentId> = old
        .iter()
        .map(|s| &s.segment_id)
        .filter(|id| new_ids.contains(id))
        .collect();

    new_common
        .iter()
        .enumerate()
        .filter_map(|(new_index, id)| {
            let old_index = old_common.iter().position(|old_id| old_id == id)?;
            (old_index != new_index).then(|| (*id).clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{INewsStory, StoryMeta};
    use chrono::Utc;

    fn segment(id: &str, locator: &str, rank: u32) -> RundownSegment {
        RundownSegment {
            segment_id: SegmentId::from(id),
            name: id.to_string(),
            modified: Utc::now(),
            rank: Rank::integer(rank),
            locator: locator.to_string(),
            i_news_story: INewsStory {
                meta: StoryMeta::default(),
                body: serde_json::Value::Null,
            },
        }
    }

    fn rundown(id: &str, segments: Vec<RundownSegment>) -> INewsRundown {
        INewsRundown {
            rundown_id: RundownId::from(id),
            name: id.to_string(),
            gateway_version: "v1".to_string(),
            segments,
            back_time: None,
        }
    }

    #[test]
    fn brand_new_rundown_is_created_with_no_separate_segment_events() {
        let new = vec![rundown("R_1", vec![segment("a", "v1", 1)])];
        let diff = diff_playlist(&new, &[]);
        assert_eq!(diff.rundown_changes, vec![RundownChange::Created(new[0].clone())]);
        assert!(diff.segment_changes.is_empty());
    }

    #[test]
    fn missing_rundown_is_deleted_with_segment_deletes() {
        let old = vec![rundown("R_1", vec![segment("a", "v1", 1)])];
        let diff = diff_playlist(&[], &old);
        assert_eq!(
            diff.rundown_changes,
            vec![RundownChange::Deleted(RundownId::from("R_1"))]
        );
        assert_eq!(
            diff.segment_changes,
            vec![SegmentChange::Deleted {
                rundown_id: RundownId::from("R_1"),
                segment_id: SegmentId::from("a"),
            }]
        );
    }

    #[test]
    fn changed_locator_emits_segment_changed_without_rundown_event() {
        let old = vec![rundown("R_1", vec![segment("a", "v1", 1)])];
        let new = vec![rundown("R_1", vec![segment("a", "v2", 1)])];
        let diff = diff_playlist(&new, &old);
        assert!(diff.rundown_changes.is_empty());
        assert_eq!(
            diff.segment_changes,
            vec![SegmentChange::Changed {
                rundown_id: RundownId::from("R_1"),
                segment: segment("a", "v2", 1),
            }]
        );
    }

    #[test]
    fn reordered_segments_emit_moved_and_coalesced_rank_update() {
        let old = vec![rundown(
            "R_1",
            vec![segment("a", "v1", 1), segment("b", "v1", 2)],
        )];
        let new = vec![rundown(
            "R_1",
            vec![segment("b", "v1", 1), segment("a", "v1", 2)],
        )];
        let diff = diff_playlist(&new, &old);
        assert!(diff.rundown_changes.is_empty());
        assert_eq!(diff.segment_changes.len(), 2);
        assert!(diff
            .segment_changes
            .iter()
            .all(|c| matches!(c, SegmentChange::Moved { .. })));
        assert_eq!(diff.rank_updates.len(), 1);
        assert_eq!(diff.rank_updates[0].1.len(), 2);
    }

    #[test]
    fn unmoved_unchanged_segment_emits_nothing() {
        let old = vec![rundown("R_1", vec![segment("a", "v1", 1)])];
        let new = vec![rundown("R_1", vec![segment("a", "v1", 1)])];
        let diff = diff_playlist(&new, &old);
        assert!(diff.rundown_changes.is_empty());
        assert!(diff.segment_changes.is_empty());
        assert!(diff.rank_updates.is_empty());
    }

    #[test]
    fn inserting_a_segment_does_not_shift_its_untouched_peers() {
        let old = vec![rundown(
            "R_1",
            vec![segment("a", "v1", 1), segment("b", "v1", 2), segment("c", "v1", 3)],
        )];
        let new = vec![rundown(
            "R_1",
            vec![
                segment("a", "v1", 1),
                segment("d", "v1", 1), // new segment inserted between a and b
                segment("b", "v1", 2),
                segment("c", "v1", 3),
            ],
        )];
        let diff = diff_playlist(&new, &old);
        assert!(diff.rundown_changes.is_empty());
        assert_eq!(
            diff.segment_changes,
            vec![SegmentChange::Created {
                rundown_id: RundownId::from("R_1"),
                segment: segment("d", "v1", 1),
            }],
            "b and c's shifted array index must not be mistaken for a move: {:?}",
            diff.segment_changes
        );
        assert!(diff.rank_updates.is_empty());
    }
}
