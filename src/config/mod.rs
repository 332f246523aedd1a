//! Typed configuration, loaded from TOML plus environment overrides.
//!
//! Mirrors the teacher's `Figment::new().merge(Toml::file(..)).merge(Env::prefixed(..))`
//! layering, with defaults supplied the same way: centralized constants
//! in [`defaults`], merged in as a `Serialized` provider so every field
//! is still overridable from the file or environment.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub mod defaults;
pub mod duration_serde;

use defaults::*;

/// One NRCS queue this gateway watches, and the `PlaylistId` it maps to
/// downstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueConfig {
    pub queue_id: String,
    pub playlist_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NrcsConfig {
    pub base_url: String,
    #[serde(with = "duration_serde::duration", default = "default_connect_timeout")]
    pub connect_timeout: Duration,
    #[serde(with = "duration_serde::duration", default = "default_request_timeout")]
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlPlaneConfig {
    pub base_url: String,
    #[serde(with = "duration_serde::duration", default = "default_connect_timeout")]
    pub connect_timeout: Duration,
    #[serde(with = "duration_serde::duration", default = "default_request_timeout")]
    pub request_timeout: Duration,
}

/// Fields named in spec.md §6: the watched queues, poll cadence,
/// expected gateway version, debug flag, and the rank-rebase tuning
/// knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatcherConfig {
    pub queues: Vec<QueueConfig>,
    #[serde(with = "duration_serde::duration", default = "default_poll_interval")]
    pub poll_interval: Duration,
    pub gateway_version: String,
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_rank_fraction_floor")]
    pub rank_fraction_floor: Decimal,
    #[serde(
        with = "duration_serde::duration",
        default = "default_rank_rebase_cooldown"
    )]
    pub rank_rebase_cooldown: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Plain,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MetricsConfig {
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub nrcs: NrcsConfig,
    pub control_plane: ControlPlaneConfig,
    pub watcher: WatcherConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// How often the [`crate::control_plane::FilePollingConfigSource`]
    /// re-reads the config file to check for a settings change.
    #[serde(
        with = "duration_serde::duration",
        default = "default_config_reload_interval"
    )]
    pub config_reload_interval: Duration,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    pub fn load_from_file(config_file: impl AsRef<Path>) -> Result<Self> {
        let config_file = config_file.as_ref();
        let mut figment = Figment::new();
        if config_file.exists() {
            figment = figment.merge(Toml::file(config_file));
        } else {
            tracing::warn!(
                path = %config_file.display(),
                "config file not found, relying on environment overrides only"
            );
        }
        let config: Config = figment
            .merge(Env::prefixed("RUNDOWN_WATCHER_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// Whether the watcher-relevant fields differ, ignoring fields a
    /// reload should not itself react to (e.g. `config_reload_interval`).
    pub fn same_settings(&self, other: &Config) -> bool {
        self.nrcs == other.nrcs
            && self.control_plane == other.control_plane
            && self.watcher == other.watcher
    }
}
