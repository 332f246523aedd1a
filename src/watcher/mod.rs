//! Watcher Loop (§4.5): the orchestrator. Owns every cache, drives a
//! single-flight poll timer, and calls the NRCS adapter, resolver, rank
//! assigner, and differ in order, emitting the result as a broadcast
//! event stream.

pub mod cache;
pub mod events;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use opentelemetry::KeyValue;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::WatcherConfig;
use crate::control_plane::{ControlPlaneClient, StatusCode};
use crate::differ::{diff_playlist, PlaylistDiff, RundownChange, SegmentChange};
use crate::errors::AppResult;
use crate::models::{INewsRundown, PlaylistId, RundownId, RundownSegment, SegmentId};
use crate::nrcs::NrcsClient;
use crate::observability::AppObservability;
use crate::rank::assign_ranks;
use crate::resolver::{resolve_playlist, RundownBoundaryDetector};

use cache::WatcherState;
pub use events::WatcherEvent;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

enum PollOutcome {
    Good,
    VersionMismatch,
}

/// One watched NRCS queue and the playlist id it maps to.
#[derive(Debug, Clone)]
pub struct WatchedQueue {
    pub queue_id: String,
    pub playlist_id: PlaylistId,
}

pub struct Watcher {
    nrcs: Arc<dyn NrcsClient>,
    control_plane: Arc<dyn ControlPlaneClient>,
    boundary: Arc<dyn RundownBoundaryDetector>,
    observability: Arc<AppObservability>,
    config: WatcherConfig,
    queues: Vec<WatchedQueue>,
    state: Mutex<WatcherState>,
    events_tx: broadcast::Sender<WatcherEvent>,
    cancellation: CancellationToken,
    running: AtomicBool,
}

impl Watcher {
    pub fn new(
        config: WatcherConfig,
        nrcs: Arc<dyn NrcsClient>,
        control_plane: Arc<dyn ControlPlaneClient>,
        boundary: Arc<dyn RundownBoundaryDetector>,
        observability: Arc<AppObservability>,
    ) -> Arc<Self> {
        let queues = config
            .queues
            .iter()
            .map(|q| WatchedQueue {
                queue_id: q.queue_id.clone(),
                playlist_id: PlaylistId::from(q.playlist_id.clone()),
            })
            .collect();
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Arc::new(Self {
            nrcs,
            control_plane,
            boundary,
            observability,
            config,
            queues,
            state: Mutex::new(WatcherState::default()),
            events_tx,
            cancellation: CancellationToken::new(),
            running: AtomicBool::new(false),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WatcherEvent> {
        self.events_tx.subscribe()
    }

    /// Begin polling. Spawns the self-rescheduling poll task; safe to
    /// call once per `Watcher` instance.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let watcher = Arc::clone(self);
        let token = self.cancellation.clone();

        tokio::spawn(async move {
            loop {
                if token.is_cancelled() {
                    break;
                }
                watcher.run_poll_cycle().await;

                let wake_at = tokio::time::Instant::now() + watcher.config.poll_interval;
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep_until(wake_at) => {}
                }
            }
        });
    }

    /// Cancel the poll timer. Safe to call repeatedly. Does not
    /// interrupt an in-flight cycle — await [`Watcher::dispose`]'s
    /// caller acquiring the processing lock to observe quiescence.
    pub fn stop(&self) {
        self.cancellation.cancel();
    }

    pub fn dispose(&self) {
        self.stop();
    }

    /// Atomically invalidate cached state for one rundown and arm the
    /// skip-cache flag so the next poll rebuilds it from scratch rather
    /// than trusting the in-memory snapshot.
    pub async fn resync_rundown(&self, rundown_id: &RundownId) {
        let mut state = self.state.lock().await;

        for rundowns in state.cached_assigned_rundowns.values() {
            if let Some(rundown) = rundowns.iter().find(|r| &r.rundown_id == rundown_id) {
                for segment in &rundown.segments {
                    state.i_news_data_cache.remove(&segment.segment_id);
                }
            }
        }
        for rundowns in state.cached_assigned_rundowns.values_mut() {
            rundowns.retain(|r| &r.rundown_id != rundown_id);
        }
        state.previous_ranks.remove(rundown_id);
        state.last_forced_rank_recalculation.remove(rundown_id);
        state.skip_cache_for_rundown.insert(rundown_id.clone());

        info!(%rundown_id, "rundown resync armed");
    }

    /// Run one poll cycle over every configured queue, serially, under
    /// a single acquisition of the processing lock.
    pub async fn run_poll_cycle(&self) {
        let mut state = match self.state.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!("processing lock contended, skipping this poll cycle");
                let _ = self
                    .control_plane
                    .set_status(
                        StatusCode::WarningMinor,
                        &["poll skipped: processing lock contended".to_string()],
                    )
                    .await;
                return;
            }
        };

        let started = std::time::Instant::now();
        let mut messages = Vec::new();
        let mut had_failure = false;

        for queue in &self.queues {
            match self.poll_one_queue(&mut state, queue).await {
                Ok(PollOutcome::Good) => {}
                Ok(PollOutcome::VersionMismatch) => {
                    debug!(queue_id = %queue.queue_id, "gateway version mismatch, skipping queue");
                }
                Err(error) => {
                    had_failure = true;
                    messages.push(format!("{}: {error}", queue.queue_id));
                    warn!(queue_id = %queue.queue_id, %error, "poll failed for queue");
                    self.publish(WatcherEvent::Warning(format!(
                        "{}: {error}",
                        queue.queue_id
                    )));
                }
            }
        }

        self.observability
            .poll_duration
            .record(started.elapsed().as_secs_f64(), &[]);
        self.observability.poll_outcomes.add(
            1,
            &[KeyValue::new(
                "outcome",
                if had_failure { "fetch_failure" } else { "good" },
            )],
        );

        let backlog = self.nrcs.queue_length().await;
        if backlog > 0 {
            warn!(backlog, "NRCS adapter reports nonzero in-flight queue length after poll");
            self.observability.nrcs_backlog_warnings.add(1, &[]);
            self.publish(WatcherEvent::Warning(format!(
                "NRCS adapter reports {backlog} in-flight request(s) after poll"
            )));
        }

        let status = if had_failure {
            StatusCode::WarningMajor
        } else {
            StatusCode::Good
        };
        if let Err(error) = self.control_plane.set_status(status, &messages).await {
            warn!(%error, "failed to report status to control plane");
        }
    }

    async fn poll_one_queue(
        &self,
        state: &mut WatcherState,
        queue: &WatchedQueue,
    ) -> AppResult<PollOutcome> {
        let reduced = self.nrcs.download_rundown(&queue.queue_id).await?;
        if reduced.gateway_version != self.config.gateway_version {
            return Ok(PollOutcome::VersionMismatch);
        }

        let stale_ids: Vec<SegmentId> = reduced
            .segments
            .iter()
            .filter(|segment| {
                state
                    .i_news_data_cache
                    .get(&segment.segment_id)
                    .map(|cached| cached.locator != segment.locator)
                    .unwrap_or(true)
            })
            .map(|segment| segment.segment_id.clone())
            .collect();

        if !stale_ids.is_empty() {
            let fetched = self
                .nrcs
                .fetch_stories_by_id(&queue.queue_id, &stale_ids)
                .await?;
            for (segment_id, unranked) in fetched {
                state.i_news_data_cache.insert(segment_id, unranked);
            }
        }

        let mut ordered_unranked = Vec::with_capacity(reduced.segments.len());
        for reduced_segment in &reduced.segments {
            match state.i_news_data_cache.get(&reduced_segment.segment_id) {
                Some(unranked) => ordered_unranked.push(unranked.clone()),
                None => {
                    warn!(
                        rundown_id = %queue.playlist_id,
                        segment_id = %reduced_segment.segment_id,
                        "cache miss after fetch, dropping segment from this poll"
                    );
                    self.publish(WatcherEvent::Warning(format!(
                        "cache miss for segment {} in playlist {}, dropping from this poll",
                        reduced_segment.segment_id, queue.playlist_id
                    )));
                }
            }
        }

        let resolved = resolve_playlist(&queue.playlist_id, &ordered_unranked, self.boundary.as_ref());

        let rank_floor = self.config.rank_fraction_floor;
        let rank_cooldown = chrono::Duration::from_std(self.config.rank_rebase_cooldown)
            .unwrap_or_else(|_| chrono::Duration::seconds(30));

        let mut new_rundowns = Vec::with_capacity(resolved.rundowns.len());
        for resolved_rundown in &resolved.rundowns {
            let rundown_id = &resolved_rundown.rundown_id;
            let previous_ranks = state
                .previous_ranks
                .get(rundown_id)
                .cloned()
                .unwrap_or_default();
            let last_forced = state.last_forced_rank_recalculation.get(rundown_id).copied();

            let assignment = assign_ranks(
                &resolved_rundown.segment_ids,
                &previous_ranks,
                last_forced,
                Utc::now(),
                rank_floor,
                rank_cooldown,
            );
            if assignment.recalculated_as_integers {
                state
                    .last_forced_rank_recalculation
                    .insert(rundown_id.clone(), Utc::now());
                self.observability.rank_rebases.add(1, &[]);
            }
            state
                .previous_ranks
                .insert(rundown_id.clone(), assignment.assigned_ranks.clone());

            let mut segments = Vec::with_capacity(resolved_rundown.segment_ids.len());
            for segment_id in &resolved_rundown.segment_ids {
                let Some(unranked) = state.i_news_data_cache.get(segment_id) else {
                    continue;
                };
                let rank = assignment
                    .assigned_ranks
                    .get(segment_id)
                    .copied()
                    .unwrap_or_else(|| {
                        previous_ranks
                            .get(segment_id)
                            .copied()
                            .unwrap_or_else(|| crate::models::Rank::integer(0))
                    });
                segments.push(RundownSegment {
                    segment_id: segment_id.clone(),
                    name: unranked.name.clone(),
                    modified: unranked.modified,
                    rank,
                    locator: unranked.locator.clone(),
                    i_news_story: unranked.i_news_story.clone(),
                });
            }

            new_rundowns.push(INewsRundown {
                rundown_id: rundown_id.clone(),
                name: rundown_id.as_str().to_string(),
                gateway_version: reduced.gateway_version.clone(),
                segments,
                back_time: resolved_rundown.back_time,
            });
        }

        let old_rundowns = self
            .seed_comparison_snapshot(state, &queue.playlist_id, &resolved.rundowns, &stale_ids, &reduced.gateway_version)
            .await;

        let diff = diff_playlist(&new_rundowns, &old_rundowns);

        state
            .cached_assigned_rundowns
            .insert(queue.playlist_id.clone(), new_rundowns);
        state
            .cached_playlist_assignments
            .insert(queue.playlist_id.clone(), resolved);

        self.emit_diff(&diff);

        Ok(PollOutcome::Good)
    }

    /// Returns the prior snapshot to diff against. On a warm cache this
    /// is just what's already stored; on a cold one (restart, or a
    /// freshly-resynced rundown) the control-plane's previously-ingested
    /// view is consulted so a restart doesn't recreate everything the
    /// control plane already has.
    async fn seed_comparison_snapshot(
        &self,
        state: &mut WatcherState,
        playlist_id: &PlaylistId,
        resolved_rundowns: &[crate::models::ResolvedRundown],
        stale_ids: &[SegmentId],
        gateway_version: &str,
    ) -> Vec<INewsRundown> {
        let mut old_rundowns = state
            .cached_assigned_rundowns
            .get(playlist_id)
            .cloned()
            .unwrap_or_default();

        for resolved_rundown in resolved_rundowns {
            let rundown_id = &resolved_rundown.rundown_id;
            let already_known = old_rundowns.iter().any(|r| &r.rundown_id == rundown_id);
            if already_known {
                state.skip_cache_for_rundown.remove(rundown_id);
                continue;
            }
            if state.skip_cache_for_rundown.remove(rundown_id) {
                continue;
            }

            let stale_in_rundown: Vec<SegmentId> = resolved_rundown
                .segment_ids
                .iter()
                .filter(|id| stale_ids.contains(id))
                .cloned()
                .collect();
            if stale_in_rundown.is_empty() {
                continue;
            }

            match self
                .control_plane
                .get_segments_cache_by_id(rundown_id, &stale_in_rundown)
                .await
            {
                Ok(cached) if !cached.is_empty() => {
                    old_rundowns.push(INewsRundown {
                        rundown_id: rundown_id.clone(),
                        name: rundown_id.as_str().to_string(),
                        gateway_version: gateway_version.to_string(),
                        segments: cached.into_values().collect(),
                        back_time: None,
                    });
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(%rundown_id, %error, "control-plane cache fetch failed, treating as cold");
                }
            }
        }

        old_rundowns
    }

    /// Emits in the exact §4.4 order: `RundownDeleted` then `SegmentDeleted`
    /// (step 1), `RundownCreated`/`RundownUpdated` (step 2), the remaining
    /// `SegmentChanged`/`SegmentCreated` not already covered by a
    /// containing rundown create/update (step 3), then coalesced
    /// `segment_ranks_update`s (step 4). `diff.rundown_changes` and
    /// `diff.segment_changes` each hold every variant in one vector, so
    /// this filters by variant on each pass rather than emitting either
    /// vector in one shot.
    fn emit_diff(&self, diff: &PlaylistDiff) {
        for change in &diff.rundown_changes {
            if let RundownChange::Deleted(rundown_id) = change {
                self.publish(WatcherEvent::RundownDelete {
                    rundown_id: rundown_id.clone(),
                });
            }
        }

        for change in &diff.segment_changes {
            if let SegmentChange::Deleted { rundown_id, segment_id } = change {
                self.publish(WatcherEvent::SegmentDelete {
                    rundown_id: rundown_id.clone(),
                    segment_id: segment_id.clone(),
                });
            }
        }

        for change in &diff.rundown_changes {
            let event = match change.clone() {
                RundownChange::Created(rundown) => Some(WatcherEvent::RundownCreate {
                    rundown_id: rundown.rundown_id.clone(),
                    rundown,
                }),
                RundownChange::Updated(rundown) => Some(WatcherEvent::RundownUpdate {
                    rundown_id: rundown.rundown_id.clone(),
                    rundown,
                }),
                RundownChange::Deleted(_) => None,
            };
            if let Some(event) = event {
                self.publish(event);
            }
        }

        for change in &diff.segment_changes {
            let event = match change.clone() {
                SegmentChange::Created { rundown_id, segment } => Some(WatcherEvent::SegmentCreate {
                    rundown_id,
                    segment_id: segment.segment_id.clone(),
                    segment,
                }),
                SegmentChange::Changed { rundown_id, segment } => Some(WatcherEvent::SegmentUpdate {
                    rundown_id,
                    segment_id: segment.segment_id.clone(),
                    segment,
                }),
                // Already emitted above.
                SegmentChange::Deleted { .. } => None,
                // Moved segments carry no individual event; their rank
                // change is coalesced into segment_ranks_update below.
                SegmentChange::Moved { .. } => None,
            };
            if let Some(event) = event {
                self.publish(event);
            }
        }

        for (rundown_id, ranks) in &diff.rank_updates {
            self.publish(WatcherEvent::SegmentRanksUpdate {
                rundown_id: rundown_id.clone(),
                ranks: ranks.clone(),
            });
        }
    }

    fn publish(&self, event: WatcherEvent) {
        self.observability
            .events_emitted
            .add(1, &[KeyValue::new("kind", event.kind())]);
        let _ = self.events_tx.send(event);
    }
}
