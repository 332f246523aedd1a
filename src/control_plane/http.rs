//! `reqwest`-backed [`ControlPlaneClient`] implementation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::errors::{ControlPlaneError, ControlPlaneResult};
use crate::models::{RundownId, RundownSegment, SegmentId};

use super::{ControlPlaneClient, StatusCode};

pub struct HttpControlPlaneClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct StatusReport<'a> {
    code: &'static str,
    messages: &'a [String],
}

impl HttpControlPlaneClient {
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> ControlPlaneResult<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl ControlPlaneClient for HttpControlPlaneClient {
    async fn set_status(&self, code: StatusCode, messages: &[String]) -> ControlPlaneResult<()> {
        let url = format!("{}/status", self.base_url);
        self.client
            .post(&url)
            .json(&StatusReport {
                code: code.as_str(),
                messages,
            })
            .send()
            .await
            .map_err(|source| ControlPlaneError::StatusReportFailed(source.to_string()))?
            .error_for_status()
            .map_err(|source| ControlPlaneError::StatusReportFailed(source.to_string()))?;
        Ok(())
    }

    async fn get_segments_cache_by_id(
        &self,
        rundown_id: &RundownId,
        segment_ids: &[SegmentId],
    ) -> ControlPlaneResult<HashMap<SegmentId, RundownSegment>> {
        let url = format!(
            "{}/rundowns/{rundown_id}/segments/cache",
            self.base_url
        );
        let ids: Vec<&str> = segment_ids.iter().map(SegmentId::as_str).collect();
        let response = self
            .client
            .post(&url)
            .json(&ids)
            .send()
            .await
            .map_err(|source| ControlPlaneError::CacheFetchFailed {
                rundown_id: rundown_id.clone(),
                message: source.to_string(),
            })?
            .error_for_status()
            .map_err(|source| ControlPlaneError::CacheFetchFailed {
                rundown_id: rundown_id.clone(),
                message: source.to_string(),
            })?;

        let segments: Vec<RundownSegment> =
            response
                .json()
                .await
                .map_err(|source| ControlPlaneError::CacheFetchFailed {
                    rundown_id: rundown_id.clone(),
                    message: source.to_string(),
                })?;

        Ok(segments
            .into_iter()
            .map(|segment| (segment.segment_id.clone(), segment))
            .collect())
    }
}
