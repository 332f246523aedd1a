//! Configuration default values, kept centralized so they're easy to
//! change in one place.

use std::time::Duration;

use rust_decimal::Decimal;

use super::LogFormat;

pub fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

pub fn default_request_timeout() -> Duration {
    Duration::from_secs(15)
}

pub fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

pub fn default_rank_fraction_floor() -> Decimal {
    Decimal::new(1, 6) // 0.000001
}

pub fn default_rank_rebase_cooldown() -> Duration {
    Duration::from_secs(30)
}

pub fn default_config_reload_interval() -> Duration {
    Duration::from_secs(10)
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_log_format() -> LogFormat {
    LogFormat::Plain
}
