//! `reqwest`-backed [`NrcsClient`](super::NrcsClient) implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::errors::{NrcsError, NrcsResult};
use crate::models::{ReducedRundown, SegmentId, UnrankedSegment};

use super::NrcsClient;

/// NRCS adapter over HTTP. `reqwest::Client` already pools connections
/// internally, so one instance is shared across every queue this
/// gateway watches.
pub struct HttpNrcsClient {
    client: Client,
    base_url: String,
    in_flight: AtomicUsize,
}

impl HttpNrcsClient {
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> NrcsResult<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            in_flight: AtomicUsize::new(0),
        })
    }

    async fn guarded<T, F>(&self, fut: F) -> NrcsResult<T>
    where
        F: std::future::Future<Output = NrcsResult<T>>,
    {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let result = fut.await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl NrcsClient for HttpNrcsClient {
    async fn download_rundown(&self, queue_id: &str) -> NrcsResult<ReducedRundown> {
        self.guarded(async {
            let url = format!("{}/queues/{queue_id}/rundown", self.base_url);
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|source| {
                    if source.is_timeout() {
                        NrcsError::Timeout {
                            queue_id: queue_id.to_string(),
                        }
                    } else {
                        NrcsError::from(source)
                    }
                })?
                .error_for_status()
                .map_err(|source| NrcsError::RequestFailed {
                    queue_id: queue_id.to_string(),
                    message: source.to_string(),
                })?;

            response
                .json::<ReducedRundown>()
                .await
                .map_err(|source| NrcsError::MalformedResponse {
                    queue_id: queue_id.to_string(),
                    message: source.to_string(),
                })
        })
        .await
    }

    async fn fetch_stories_by_id(
        &self,
        queue_id: &str,
        segment_ids: &[SegmentId],
    ) -> NrcsResult<HashMap<SegmentId, UnrankedSegment>> {
        self.guarded(async {
            let url = format!("{}/queues/{queue_id}/stories", self.base_url);
            let ids: Vec<&str> = segment_ids.iter().map(SegmentId::as_str).collect();
            let response = self
                .client
                .post(&url)
                .json(&ids)
                .send()
                .await
                .map_err(|source| {
                    if source.is_timeout() {
                        NrcsError::Timeout {
                            queue_id: queue_id.to_string(),
                        }
                    } else {
                        NrcsError::from(source)
                    }
                })?
                .error_for_status()
                .map_err(|source| NrcsError::RequestFailed {
                    queue_id: queue_id.to_string(),
                    message: source.to_string(),
                })?;

            let stories: Vec<UnrankedSegment> =
                response
                    .json()
                    .await
                    .map_err(|source| NrcsError::MalformedResponse {
                        queue_id: queue_id.to_string(),
                        message: source.to_string(),
                    })?;

            Ok(stories
                .into_iter()
                .map(|segment| (segment.segment_id.clone(), segment))
                .collect())
        })
        .await
    }

    async fn queue_length(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}
