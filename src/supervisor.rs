//! Owns the currently-running [`Watcher`], replacing it wholesale
//! whenever the [`ConfigSource`] yields a new [`Config`] (§9: "represent
//! the watcher as a self-contained value owned by a supervisor; replace
//! it wholesale on config change").

use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tracing::{error, info};

use crate::config::Config;
use crate::control_plane::{ConfigSource, HttpControlPlaneClient};
use crate::models::RundownId;
use crate::nrcs::HttpNrcsClient;
use crate::observability::AppObservability;
use crate::resolver::RundownBoundaryDetector;
use crate::watcher::Watcher;

pub struct Supervisor {
    boundary: Arc<dyn RundownBoundaryDetector>,
    initial_resync: Option<RundownId>,
}

impl Supervisor {
    pub fn new(boundary: Arc<dyn RundownBoundaryDetector>, initial_resync: Option<RundownId>) -> Self {
        Self {
            boundary,
            initial_resync,
        }
    }

    /// Drives `config_source` until it ends (it shouldn't, under normal
    /// operation) or the caller drops the future. The caller is
    /// responsible for racing this against a shutdown signal.
    pub async fn run(&self, config_source: impl ConfigSource) {
        let mut configs: Pin<Box<dyn Stream<Item = Config> + Send>> = config_source.watch();
        let mut current: Option<Arc<Watcher>> = None;
        let mut first = true;

        while let Some(config) = configs.next().await {
            if let Some(watcher) = current.take() {
                info!("configuration changed, tearing down running watcher");
                watcher.dispose();
            }

            match self.build_watcher(&config).await {
                Ok(watcher) => {
                    if first {
                        first = false;
                        if let Some(rundown_id) = &self.initial_resync {
                            watcher.resync_rundown(rundown_id).await;
                        }
                    }
                    watcher.start();
                    current = Some(watcher);
                }
                Err(error) => {
                    error!(%error, "failed to build watcher from configuration, leaving previous instance down");
                }
            }
        }

        if let Some(watcher) = current {
            watcher.dispose();
        }
    }

    async fn build_watcher(&self, config: &Config) -> anyhow::Result<Arc<Watcher>> {
        let nrcs = Arc::new(HttpNrcsClient::new(
            config.nrcs.base_url.clone(),
            config.nrcs.connect_timeout,
            config.nrcs.request_timeout,
        )?);
        let control_plane = Arc::new(HttpControlPlaneClient::new(
            config.control_plane.base_url.clone(),
            config.control_plane.connect_timeout,
            config.control_plane.request_timeout,
        )?);
        let observability = Arc::new(AppObservability::new(config.metrics.otlp_endpoint.as_deref())?);

        Ok(Watcher::new(
            config.watcher.clone(),
            nrcs,
            control_plane,
            self.boundary.clone(),
            observability,
        ))
    }
}
