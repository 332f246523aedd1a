//! Property-based tests for the two invariants spec.md §8 calls out as
//! properties rather than fixed scenarios: rank monotonicity, and the
//! differ's at-most-one-segment-change-kind rule.

use std::collections::HashSet;

use chrono::Utc;
use proptest::collection::vec as vec_strategy;
use proptest::prelude::*;
use proptest::sample::subsequence;
use rust_decimal::Decimal;

use rundown_watcher::differ::{diff_playlist, SegmentChange};
use rundown_watcher::models::{
    INewsRundown, INewsStory, Rank, RundownId, RundownSegment, SegmentId, SegmentRanking,
    StoryMeta,
};
use rundown_watcher::rank::assign_ranks;

const POOL: [&str; 6] = ["a", "b", "c", "d", "e", "f"];
const LOCATORS: [&str; 2] = ["v1", "v2"];

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

/// A random subset of the fixed id pool, each paired with a random
/// locator, preserving the pool's relative order.
fn arb_rundown_snapshot() -> impl Strategy<Value = Vec<(String, String)>> {
    subsequence(POOL.to_vec(), 0..=POOL.len()).prop_flat_map(|ids| {
        let locators = vec_strategy(prop_oneof![Just(LOCATORS[0]), Just(LOCATORS[1])], ids.len());
        (Just(ids), locators)
            .prop_map(|(ids, locators)| {
                ids.into_iter()
                    .map(str::to_string)
                    .zip(locators.into_iter().map(str::to_string))
                    .collect()
            })
    })
}

fn rundown_from(snapshot: &[(String, String)]) -> INewsRundown {
    INewsRundown {
        rundown_id: RundownId::from("R_1"),
        name: "R_1".to_string(),
        gateway_version: "v1".to_string(),
        segments: snapshot
            .iter()
            .enumerate()
            .map(|(i, (id, locator))| segment(id, locator, i as u32 + 1))
            .collect(),
        back_time: None,
    }
}

proptest! {
    /// For every (rundownId, segmentId) pair touched in one poll, the
    /// differ emits at most one of Created/Changed/Moved/Deleted —
    /// never two contradictory classifications for the same segment.
    #[test]
    fn differ_never_double_classifies_a_segment(
        old_snapshot in arb_rundown_snapshot(),
        new_snapshot in arb_rundown_snapshot(),
    ) {
        let old = vec![rundown_from(&old_snapshot)];
        let new = vec![rundown_from(&new_snapshot)];

        let diff = diff_playlist(&new, &old);

        let mut seen: HashSet<(RundownId, SegmentId)> = HashSet::new();
        for change in &diff.segment_changes {
            let key = match change {
                SegmentChange::Created { rundown_id, segment } => (rundown_id.clone(), segment.segment_id.clone()),
                SegmentChange::Changed { rundown_id, segment } => (rundown_id.clone(), segment.segment_id.clone()),
                SegmentChange::Moved { rundown_id, segment } => (rundown_id.clone(), segment.segment_id.clone()),
                SegmentChange::Deleted { rundown_id, segment_id } => (rundown_id.clone(), segment_id.clone()),
            };
            prop_assert!(
                seen.insert(key.clone()),
                "segment {:?} classified more than once in {:?}",
                key,
                diff.segment_changes
            );
        }
    }

    /// Assigned ranks strictly increase in resolved order, for any
    /// number of segments and any prior rank assignment (including none,
    /// a fully-stable one, and one dense enough to force a rebase).
    #[test]
    fn assigned_ranks_are_strictly_increasing(
        count in 1usize..10,
        seed_with_previous in any::<bool>(),
    ) {
        let segment_ids: Vec<SegmentId> = (0..count)
            .map(|i| SegmentId::from(format!("seg-{i}")))
            .collect();

        let previous: SegmentRanking = if seed_with_previous {
            segment_ids
                .iter()
                .enumerate()
                .map(|(i, id)| (id.clone(), Rank::integer(i as u32 + 1)))
                .collect()
        } else {
            SegmentRanking::new()
        };

        let result = assign_ranks(
            &segment_ids,
            &previous,
            None,
            Utc::now(),
            Decimal::new(1, 6),
            chrono::Duration::seconds(30),
        );

        let ranks: Vec<Rank> = segment_ids
            .iter()
            .map(|id| result.assigned_ranks[id])
            .collect();
        prop_assert!(
            ranks.windows(2).all(|pair| pair[0] < pair[1]),
            "ranks not strictly increasing: {:?}",
            ranks
        );
    }

    /// A segment whose previous rank already sits strictly between its
    /// neighbours' previous ranks keeps that exact rank — no spurious
    /// rank_updates for segments that haven't moved.
    #[test]
    fn unmoved_segment_rank_is_never_perturbed(count in 2usize..8) {
        let segment_ids: Vec<SegmentId> = (0..count)
            .map(|i| SegmentId::from(format!("seg-{i}")))
            .collect();
        let previous: SegmentRanking = segment_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), Rank::integer(i as u32 + 1)))
            .collect();

        let result = assign_ranks(
            &segment_ids,
            &previous,
            None,
            Utc::now(),
            Decimal::new(1, 6),
            chrono::Duration::seconds(30),
        );

        for id in &segment_ids {
            prop_assert_eq!(result.assigned_ranks[id], previous[id]);
        }
    }
}
