//! End-to-end scenarios for the watcher loop, driving [`Watcher::run_poll_cycle`]
//! directly against hand-rolled `NrcsClient`/`ControlPlaneClient` stand-ins
//! rather than a real NRCS or control plane. Each test mirrors one of the
//! scenarios this gateway is built to converge on.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{broadcast, Mutex};

use rundown_watcher::config::{QueueConfig, WatcherConfig};
use rundown_watcher::control_plane::{ControlPlaneClient, StatusCode};
use rundown_watcher::errors::{ControlPlaneResult, NrcsResult};
use rundown_watcher::models::{
    INewsStory, ReducedRundown, ReducedSegment, Rank, RundownId, RundownSegment, SegmentId,
    StoryMeta, UnrankedSegment,
};
use rundown_watcher::nrcs::NrcsClient;
use rundown_watcher::observability::AppObservability;
use rundown_watcher::resolver::MarkerFieldBoundaryDetector;
use rundown_watcher::watcher::{Watcher, WatcherEvent};

const GATEWAY_VERSION: &str = "v1";

struct StubNrcs {
    rundown: Mutex<ReducedRundown>,
    stories: Mutex<HashMap<SegmentId, UnrankedSegment>>,
}

impl StubNrcs {
    fn new(rundown: ReducedRundown, stories: Vec<UnrankedSegment>) -> Self {
        Self {
            rundown: Mutex::new(rundown),
            stories: Mutex::new(stories.into_iter().map(|s| (s.segment_id.clone(), s)).collect()),
        }
    }

    async fn set_rundown(&self, rundown: ReducedRundown) {
        *self.rundown.lock().await = rundown;
    }

    async fn upsert_story(&self, story: UnrankedSegment) {
        self.stories.lock().await.insert(story.segment_id.clone(), story);
    }
}

#[async_trait]
impl NrcsClient for StubNrcs {
    async fn download_rundown(&self, _queue_id: &str) -> NrcsResult<ReducedRundown> {
        Ok(self.rundown.lock().await.clone())
    }

    async fn fetch_stories_by_id(
        &self,
        _queue_id: &str,
        ids: &[SegmentId],
    ) -> NrcsResult<HashMap<SegmentId, UnrankedSegment>> {
        let stories = self.stories.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| stories.get(id).cloned().map(|s| (id.clone(), s)))
            .collect())
    }

    async fn queue_length(&self) -> usize {
        0
    }
}

/// Always reports an empty previously-ingested cache, so cold-start polls
/// don't suppress the create events this gateway would otherwise emit.
struct EmptyControlPlane {
    statuses: Mutex<Vec<(StatusCode, Vec<String>)>>,
}

impl EmptyControlPlane {
    fn new() -> Self {
        Self {
            statuses: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ControlPlaneClient for EmptyControlPlane {
    async fn set_status(&self, code: StatusCode, messages: &[String]) -> ControlPlaneResult<()> {
        self.statuses.lock().await.push((code, messages.to_vec()));
        Ok(())
    }

    async fn get_segments_cache_by_id(
        &self,
        _rundown_id: &RundownId,
        _segment_ids: &[SegmentId],
    ) -> ControlPlaneResult<HashMap<SegmentId, RundownSegment>> {
        Ok(HashMap::new())
    }
}

fn story(id: &str, locator: &str, rundown_start: bool) -> UnrankedSegment {
    UnrankedSegment {
        segment_id: SegmentId::from(id),
        rundown_id: RundownId::from("unused"),
        name: id.to_string(),
        modified: Utc::now(),
        locator: locator.to_string(),
        i_news_story: INewsStory {
            meta: StoryMeta {
                float: false,
                rundown_start,
                back_time: None,
            },
            body: serde_json::Value::Null,
        },
    }
}

fn reduced(id: &str, locator: &str) -> ReducedSegment {
    ReducedSegment {
        segment_id: SegmentId::from(id),
        name: id.to_string(),
        modified: Utc::now(),
        rank: Rank::integer(0),
        locator: locator.to_string(),
    }
}

fn listing(ids_and_locators: &[(&str, &str)]) -> ReducedRundown {
    ReducedRundown {
        gateway_version: GATEWAY_VERSION.to_string(),
        segments: ids_and_locators
            .iter()
            .map(|(id, locator)| reduced(id, locator))
            .collect(),
    }
}

fn test_config(queue_id: &str, playlist_id: &str) -> WatcherConfig {
    WatcherConfig {
        queues: vec![QueueConfig {
            queue_id: queue_id.to_string(),
            playlist_id: playlist_id.to_string(),
        }],
        poll_interval: StdDuration::from_secs(2),
        gateway_version: GATEWAY_VERSION.to_string(),
        debug: false,
        rank_fraction_floor: Decimal::new(1, 6),
        rank_rebase_cooldown: StdDuration::from_secs(30),
    }
}

fn build_watcher(config: WatcherConfig, nrcs: Arc<StubNrcs>) -> Arc<Watcher> {
    let control_plane = Arc::new(EmptyControlPlane::new());
    let observability = Arc::new(AppObservability::new(None).expect("observability init"));
    Watcher::new(
        config,
        nrcs,
        control_plane,
        Arc::new(MarkerFieldBoundaryDetector),
        observability,
    )
}

fn drain(rx: &mut broadcast::Receiver<WatcherEvent>) -> Vec<WatcherEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn cold_start_one_queue_three_segments_creates_one_rundown() {
    let nrcs = Arc::new(StubNrcs::new(
        listing(&[("a", "v1"), ("b", "v1"), ("c", "v1")]),
        vec![story("a", "v1", false), story("b", "v1", false), story("c", "v1", false)],
    ));
    let watcher = build_watcher(test_config("Q", "Q"), nrcs);
    let mut rx = watcher.subscribe();

    watcher.run_poll_cycle().await;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1, "expected exactly one rundown_create event, got {events:?}");
    match &events[0] {
        WatcherEvent::RundownCreate { rundown_id, rundown } => {
            assert_eq!(rundown_id.as_str(), "Q_1");
            let ranks: Vec<Rank> = rundown.segments.iter().map(|s| s.rank).collect();
            assert_eq!(ranks, vec![Rank::integer(1), Rank::integer(2), Rank::integer(3)]);
        }
        other => panic!("expected RundownCreate, got {other:?}"),
    }
}

#[tokio::test]
async fn insert_segment_between_neighbours_emits_only_a_create() {
    let nrcs = Arc::new(StubNrcs::new(
        listing(&[("a", "v1"), ("b", "v1"), ("c", "v1")]),
        vec![story("a", "v1", false), story("b", "v1", false), story("c", "v1", false)],
    ));
    let watcher = build_watcher(test_config("Q", "Q"), nrcs.clone());
    let mut rx = watcher.subscribe();
    watcher.run_poll_cycle().await;
    drain(&mut rx); // discard the cold-start create

    nrcs.upsert_story(story("d", "v1", false)).await;
    nrcs.set_rundown(listing(&[("a", "v1"), ("d", "v1"), ("b", "v1"), ("c", "v1")]))
        .await;
    watcher.run_poll_cycle().await;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1, "expected only the new segment's create, got {events:?}");
    match &events[0] {
        WatcherEvent::SegmentCreate { rundown_id, segment_id, .. } => {
            assert_eq!(rundown_id.as_str(), "Q_1");
            assert_eq!(segment_id.as_str(), "d");
        }
        other => panic!("expected SegmentCreate, got {other:?}"),
    }
}

#[tokio::test]
async fn moving_a_segment_emits_one_coalesced_rank_update() {
    let nrcs = Arc::new(StubNrcs::new(
        listing(&[("a", "v1"), ("b", "v1"), ("c", "v1"), ("d", "v1")]),
        vec![
            story("a", "v1", false),
            story("b", "v1", false),
            story("c", "v1", false),
            story("d", "v1", false),
        ],
    ));
    let watcher = build_watcher(test_config("Q", "Q"), nrcs.clone());
    let mut rx = watcher.subscribe();
    watcher.run_poll_cycle().await;
    drain(&mut rx);

    nrcs.set_rundown(listing(&[("c", "v1"), ("a", "v1"), ("b", "v1"), ("d", "v1")]))
        .await;
    watcher.run_poll_cycle().await;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1, "expected one segment_ranks_update, got {events:?}");
    match &events[0] {
        WatcherEvent::SegmentRanksUpdate { rundown_id, ranks } => {
            assert_eq!(rundown_id.as_str(), "Q_1");
            assert!(!ranks.is_empty());
            let rank_c = ranks[&SegmentId::from("c")];
            let rank_a = ranks.get(&SegmentId::from("a")).copied().unwrap_or(Rank::integer(0));
            assert!(rank_c < rank_a, "moved segment c should now rank before a");
        }
        other => panic!("expected SegmentRanksUpdate, got {other:?}"),
    }
}

#[tokio::test]
async fn locator_change_emits_segment_update_with_no_rank_change() {
    let nrcs = Arc::new(StubNrcs::new(
        listing(&[("a", "v1"), ("b", "v1"), ("c", "v1")]),
        vec![story("a", "v1", false), story("b", "v1", false), story("c", "v1", false)],
    ));
    let watcher = build_watcher(test_config("Q", "Q"), nrcs.clone());
    let mut rx = watcher.subscribe();
    watcher.run_poll_cycle().await;
    drain(&mut rx);

    nrcs.upsert_story(story("b", "v2", false)).await;
    nrcs.set_rundown(listing(&[("a", "v1"), ("b", "v2"), ("c", "v1")])).await;
    watcher.run_poll_cycle().await;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1, "expected only a segment_update, got {events:?}");
    match &events[0] {
        WatcherEvent::SegmentUpdate { rundown_id, segment_id, segment } => {
            assert_eq!(rundown_id.as_str(), "Q_1");
            assert_eq!(segment_id.as_str(), "b");
            assert_eq!(segment.locator, "v2");
        }
        other => panic!("expected SegmentUpdate, got {other:?}"),
    }
}

#[tokio::test]
async fn rundown_boundary_marker_splits_the_playlist() {
    let nrcs = Arc::new(StubNrcs::new(
        listing(&[("a", "v1"), ("b", "v1"), ("d", "v1")]),
        vec![story("a", "v1", false), story("b", "v1", false), story("d", "v1", false)],
    ));
    let watcher = build_watcher(test_config("Q", "Q"), nrcs.clone());
    let mut rx = watcher.subscribe();
    watcher.run_poll_cycle().await;
    drain(&mut rx);

    nrcs.upsert_story(story("b", "v1", true)).await;
    watcher.run_poll_cycle().await;

    let events = drain(&mut rx);

    let deletes: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            WatcherEvent::SegmentDelete { rundown_id, segment_id } => {
                Some((rundown_id.as_str().to_string(), segment_id.as_str().to_string()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(deletes.len(), 2, "expected B and D deleted from Q_1, got {events:?}");
    assert!(deletes.contains(&("Q_1".to_string(), "b".to_string())));
    assert!(deletes.contains(&("Q_1".to_string(), "d".to_string())));

    let creates: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            WatcherEvent::RundownCreate { rundown_id, rundown } => Some((rundown_id.clone(), rundown.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(creates.len(), 1, "expected exactly one new rundown created, got {events:?}");
    assert_eq!(creates[0].0.as_str(), "Q_2");
    let created_ids: Vec<&str> = creates[0].1.segments.iter().map(|s| s.segment_id.as_str()).collect();
    assert_eq!(created_ids, vec!["b", "d"]);

    assert!(
        !events
            .iter()
            .any(|e| matches!(e, WatcherEvent::SegmentCreate { .. })),
        "segments covered by the new rundown's create must not also get their own create event"
    );

    let delete_pos = events
        .iter()
        .position(|e| matches!(e, WatcherEvent::SegmentDelete { .. }))
        .expect("expected a SegmentDelete event");
    let create_pos = events
        .iter()
        .position(|e| matches!(e, WatcherEvent::RundownCreate { .. }))
        .expect("expected a RundownCreate event");
    assert!(
        delete_pos < create_pos,
        "segment_delete(Q_1,B)/segment_delete(Q_1,D) must precede rundown_create(Q_2,...), got {events:?}"
    );
}

#[tokio::test]
async fn gateway_version_mismatch_is_skipped_silently() {
    let mut mismatched = listing(&[("a", "v1")]);
    mismatched.gateway_version = "other-version".to_string();
    let nrcs = Arc::new(StubNrcs::new(mismatched, vec![story("a", "v1", false)]));
    let watcher = build_watcher(test_config("Q", "Q"), nrcs);
    let mut rx = watcher.subscribe();

    watcher.run_poll_cycle().await;

    let events = drain(&mut rx);
    assert!(events.is_empty(), "expected no events on version mismatch, got {events:?}");
}

#[tokio::test]
async fn polling_unchanged_state_twice_only_emits_on_the_first_poll() {
    let nrcs = Arc::new(StubNrcs::new(
        listing(&[("a", "v1"), ("b", "v1")]),
        vec![story("a", "v1", false), story("b", "v1", false)],
    ));
    let watcher = build_watcher(test_config("Q", "Q"), nrcs);
    let mut rx = watcher.subscribe();

    watcher.run_poll_cycle().await;
    let first = drain(&mut rx);
    assert!(!first.is_empty());

    watcher.run_poll_cycle().await;
    let second = drain(&mut rx);
    assert!(second.is_empty(), "identical state should not re-emit: {second:?}");
}

#[tokio::test]
async fn empty_queue_produces_one_empty_rundown() {
    let nrcs = Arc::new(StubNrcs::new(listing(&[]), vec![]));
    let watcher = build_watcher(test_config("Q", "Q"), nrcs);
    let mut rx = watcher.subscribe();

    watcher.run_poll_cycle().await;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    match &events[0] {
        WatcherEvent::RundownCreate { rundown_id, rundown } => {
            assert_eq!(rundown_id.as_str(), "Q_1");
            assert!(rundown.segments.is_empty());
        }
        other => panic!("expected an empty RundownCreate, got {other:?}"),
    }
}

#[tokio::test]
async fn resync_rundown_forces_a_full_refetch_on_the_next_poll() {
    let nrcs = Arc::new(StubNrcs::new(
        listing(&[("a", "v1"), ("b", "v1")]),
        vec![story("a", "v1", false), story("b", "v1", false)],
    ));
    let watcher = build_watcher(test_config("Q", "Q"), nrcs.clone());
    let mut rx = watcher.subscribe();
    watcher.run_poll_cycle().await;
    drain(&mut rx);

    watcher.resync_rundown(&RundownId::from("Q_1")).await;
    watcher.run_poll_cycle().await;

    let events = drain(&mut rx);
    assert!(
        events.iter().any(|e| matches!(e, WatcherEvent::RundownCreate { .. })),
        "a resynced rundown should be recreated from scratch, got {events:?}"
    );
}
