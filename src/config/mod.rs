use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

// Top-level configuration, one section per concern
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub schedule: ScheduleConfig,
    pub holds: HoldConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    /// `json` switches the subscriber to JSON lines.
    pub log_format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub acquire_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

// Calendar settings used for multi-day expansion and status labels
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    pub utc_offset_minutes: i32,
    pub max_days: u32,
}

impl ScheduleConfig {
    pub fn offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { utc_offset_minutes: 0, max_days: 90 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HoldConfig {
    pub ttl_seconds: u64,
    pub key_prefix: String,
}

impl HoldConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self { ttl_seconds: 600, key_prefix: "seat_lock".to_string() }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn or_default<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value.parse().map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config {
            app: AppConfig {
                host: or_default("HOST", "0.0.0.0".to_string())?,
                port: or_default("PORT", 8000)?,
                environment: or_default("ENVIRONMENT", "development".to_string())?,
                rust_log: or_default(
                    "RUST_LOG",
                    "showtime_inventory=debug,tower_http=debug".to_string(),
                )?,
                log_format: or_default("LOG_FORMAT", "plain".to_string())?,
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                pool_size: or_default("DB_POOL_SIZE", 20)?,
                acquire_timeout_seconds: or_default("DB_ACQUIRE_TIMEOUT_SECONDS", 5)?,
            },
            redis: RedisConfig {
                url: required("REDIS_URL")?,
            },
            schedule: ScheduleConfig {
                utc_offset_minutes: or_default("SCHEDULE_UTC_OFFSET_MINUTES", 0)?,
                max_days: or_default("SCHEDULE_MAX_DAYS", 90)?,
            },
            holds: HoldConfig {
                ttl_seconds: or_default("SEAT_HOLD_TTL_SECONDS", 600)?,
                key_prefix: or_default("SEAT_HOLD_KEY_PREFIX", "seat_lock".to_string())?,
            },
        };

        let offset_seconds = config.schedule.utc_offset_minutes.checked_mul(60);
        if offset_seconds.and_then(FixedOffset::east_opt).is_none() {
            return Err(ConfigError::Invalid {
                key: "SCHEDULE_UTC_OFFSET_MINUTES",
                value: config.schedule.utc_offset_minutes.to_string(),
            });
        }
        if config.holds.ttl_seconds == 0 {
            return Err(ConfigError::Invalid {
                key: "SEAT_HOLD_TTL_SECONDS",
                value: "0".to_string(),
            });
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_offset_converts_minutes() {
        let cfg = ScheduleConfig { utc_offset_minutes: 330, max_days: 90 };
        assert_eq!(cfg.offset().local_minus_utc(), 330 * 60);
    }

    #[test]
    fn out_of_range_offset_falls_back_to_utc() {
        let cfg = ScheduleConfig { utc_offset_minutes: 24 * 60, max_days: 90 };
        assert_eq!(cfg.offset().local_minus_utc(), 0);
    }

    #[test]
    fn hold_defaults_match_ten_minute_window() {
        let holds = HoldConfig::default();
        assert_eq!(holds.ttl(), Duration::from_secs(600));
        assert_eq!(holds.key_prefix, "seat_lock");
    }
}
