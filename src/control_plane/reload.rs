//! Default [`ConfigSource`]: re-reads the config file on a coarse
//! interval. Stands in for the real control plane's observable
//! `peripheralDevices` settings collection, which this standalone crate
//! has no equivalent transport for.

use std::path::PathBuf;
use std::time::Duration;

use async_stream::stream;
use futures::Stream;
use tracing::warn;

use crate::config::Config;

use super::ConfigSource;

pub struct FilePollingConfigSource {
    path: PathBuf,
    poll_interval: Duration,
}

impl FilePollingConfigSource {
    pub fn new(path: PathBuf, poll_interval: Duration) -> Self {
        Self { path, poll_interval }
    }
}

impl ConfigSource for FilePollingConfigSource {
    fn watch(&self) -> std::pin::Pin<Box<dyn Stream<Item = Config> + Send>> {
        let path = self.path.clone();
        let poll_interval = self.poll_interval;

        Box::pin(stream! {
            let mut last: Option<Config> = None;
            loop {
                match Config::load_from_file(&path) {
                    Ok(config) => {
                        let changed = last.as_ref().map(|prev| !prev.same_settings(&config)).unwrap_or(true);
                        if changed {
                            last = Some(config.clone());
                            yield config;
                        }
                    }
                    Err(error) => {
                        warn!(%error, path = %path.display(), "failed to reload config, keeping previous settings");
                    }
                }
                tokio::time::sleep(poll_interval).await;
            }
        })
    }
}
