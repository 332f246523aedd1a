//! Rank Assigner (§4.3): computes a stable, rational segment ordering
//! across polls, falling back to a full integer rebase when repeated
//! midpoint insertion would push spacing below the configured
//! precision floor.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::{Rank, SegmentId, SegmentRanking};

/// Result of one rundown's rank assignment pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RankAssignment {
    pub assigned_ranks: SegmentRanking,
    pub recalculated_as_integers: bool,
}

/// Assign ranks to `segment_ids` (in resolved order), preserving the
/// previous rank of any segment whose position relative to its
/// already-anchored neighbours did not change.
///
/// `last_forced` is the timestamp of this rundown's last integer
/// rebase, if any; `now` and `rebase_cooldown` gate how soon another
/// forced rebase may happen after one just occurred.
pub fn assign_ranks(
    segment_ids: &[SegmentId],
    previous_ranks: &SegmentRanking,
    last_forced: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    rank_fraction_floor: Decimal,
    rebase_cooldown: chrono::Duration,
) -> RankAssignment {
    if segment_ids.is_empty() {
        return RankAssignment {
            assigned_ranks: HashMap::new(),
            recalculated_as_integers: false,
        };
    }

    let anchors = anchor_unmoved_ranks(segment_ids, previous_ranks);
    let interpolated = fill_gaps(segment_ids, &anchors);

    if floor_breached(&interpolated, segment_ids, rank_fraction_floor)
        && cooldown_elapsed(last_forced, now, rebase_cooldown)
    {
        return RankAssignment {
            assigned_ranks: integer_ranks(segment_ids),
            recalculated_as_integers: true,
        };
    }

    RankAssignment {
        assigned_ranks: interpolated,
        recalculated_as_integers: false,
    }
}

/// A previous rank is kept as an anchor only if it is strictly greater
/// than the previous anchor in traversal order — this is what "position
/// relative to neighbours did not change" reduces to for an ordered
/// list.
fn anchor_unmoved_ranks(
    segment_ids: &[SegmentId],
    previous_ranks: &SegmentRanking,
) -> Vec<Option<Rank>> {
    let mut anchors = Vec::with_capacity(segment_ids.len());
    let mut last_anchor: Option<Rank> = None;

    for id in segment_ids {
        let candidate = previous_ranks.get(id).copied();
        let keep = match (candidate, last_anchor) {
            (Some(rank), Some(prev)) => rank > prev,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if keep {
            last_anchor = candidate;
            anchors.push(candidate);
        } else {
            anchors.push(None);
        }
    }
    anchors
}

/// Fill every `None` run in `anchors` with evenly-spaced ranks strictly
/// between its bounding anchors (or synthetic bounds at either end of
/// the list).
fn fill_gaps(segment_ids: &[SegmentId], anchors: &[Option<Rank>]) -> SegmentRanking {
    let mut assigned = SegmentRanking::new();
    let len = anchors.len();
    let mut i = 0;

    while i < len {
        if let Some(rank) = anchors[i] {
            assigned.insert(segment_ids[i].clone(), rank);
            i += 1;
            continue;
        }

        let run_start = i;
        while i < len && anchors[i].is_none() {
            i += 1;
        }
        let run_end = i; // exclusive

        let lo = if run_start == 0 {
            None
        } else {
            assigned.get(&segment_ids[run_start - 1]).copied()
        };
        let hi = anchors.get(run_end).copied().flatten();

        for (offset, rank) in
            interpolate_run(lo, hi, run_end - run_start).into_iter().enumerate()
        {
            assigned.insert(segment_ids[run_start + offset].clone(), rank);
        }
    }

    assigned
}

/// Evenly spaced ranks strictly between `lo` and `hi`. Missing bounds
/// default to a unit below/above the other bound so a leading or
/// trailing run still gets well-ordered ranks.
fn interpolate_run(lo: Option<Rank>, hi: Option<Rank>, count: usize) -> Vec<Rank> {
    let count_dec = Decimal::from(count as u64 + 1);
    let lo = lo.map(|r| r.0).unwrap_or_else(|| match hi {
        Some(hi) => hi.0 - count_dec,
        None => Decimal::ZERO,
    });
    let hi = hi.map(|r| r.0).unwrap_or(lo + count_dec);

    let step = (hi - lo) / count_dec;
    (1..=count as u64)
        .map(|n| Rank(lo + step * Decimal::from(n)))
        .collect()
}

fn floor_breached(
    assigned: &SegmentRanking,
    segment_ids: &[SegmentId],
    rank_fraction_floor: Decimal,
) -> bool {
    segment_ids.windows(2).any(|pair| {
        match (assigned.get(&pair[0]), assigned.get(&pair[1])) {
            (Some(lo), Some(hi)) => Rank::gap(*lo, *hi) < rank_fraction_floor,
            _ => false,
        }
    })
}

fn cooldown_elapsed(
    last_forced: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    cooldown: chrono::Duration,
) -> bool {
    match last_forced {
        Some(last) => now - last >= cooldown,
        None => true,
    }
}

fn integer_ranks(segment_ids: &[SegmentId]) -> SegmentRanking {
    segment_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.clone(), Rank::integer(i as u32 + 1)))
        .collect()
}
