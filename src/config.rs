use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{IngestError, Result};
use crate::utils::constants::{
    DEFAULT_ARCHIVE_API_BASE, DEFAULT_AVALANCHE_API_BASE, DEFAULT_CHUNK_DAYS,
    DEFAULT_FORECAST_API_BASE, DEFAULT_HOURLY_PARAMS, DEFAULT_LANGUAGE_KEY,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_START_DATE, DEFAULT_TIMEZONE,
    DEFAULT_WARNING_HORIZON_DAYS, MINUTE_FORMAT,
};

/// Validated ingestion configuration, constructed once at startup and passed
/// by reference into every component. Loaded from an optional TOML file with
/// `BOREAS_`-prefixed environment overrides.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestConfig {
    /// Initial watermark value for uninitialized (partition, resource) pairs
    #[serde(default = "default_start_date")]
    #[validate(length(min = 1))]
    pub start_date: String,

    /// Hourly weather metrics requested from the upstream APIs
    #[serde(default = "default_hourly_params")]
    #[validate(length(min = 1))]
    pub hourly_params: Vec<String>,

    /// Timezone passed through to the weather APIs
    #[serde(default = "default_timezone")]
    #[validate(length(min = 1))]
    pub timezone: String,

    /// Base URL of the historical weather archive API
    #[serde(default = "default_archive_api_base")]
    #[validate(length(min = 1))]
    pub archive_api_base_url: String,

    /// Base URL of the weather forecast API
    #[serde(default = "default_forecast_api_base")]
    #[validate(length(min = 1))]
    pub forecast_api_base_url: String,

    /// Base URL of the avalanche warning API
    #[serde(default = "default_avalanche_api_base")]
    #[validate(length(min = 1))]
    pub avalanche_api_base_url: String,

    /// Language key for the avalanche warning API (1 Norwegian, 2 English)
    #[serde(default = "default_language_key")]
    #[validate(length(min = 1))]
    pub language_key: String,

    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    #[validate(range(min = 1, max = 600))]
    pub request_timeout_secs: u64,

    /// Maximum date-range length per archive request, in days
    #[serde(default = "default_chunk_days")]
    #[validate(range(min = 1))]
    pub chunk_days: u32,

    /// How far past today the warning fetch window extends, in days
    #[serde(default = "default_warning_horizon_days")]
    pub warning_horizon_days: u32,

    /// Warehouse root directory (Parquet tables + watermark state)
    #[serde(default = "default_warehouse_dir")]
    pub warehouse_dir: PathBuf,

    /// Concurrent partition fan-out per pipeline
    #[serde(default = "default_max_workers")]
    #[validate(range(min = 1))]
    pub max_workers: usize,
}

fn default_start_date() -> String {
    DEFAULT_START_DATE.to_string()
}

fn default_hourly_params() -> Vec<String> {
    DEFAULT_HOURLY_PARAMS.iter().map(|s| s.to_string()).collect()
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_archive_api_base() -> String {
    DEFAULT_ARCHIVE_API_BASE.to_string()
}

fn default_forecast_api_base() -> String {
    DEFAULT_FORECAST_API_BASE.to_string()
}

fn default_avalanche_api_base() -> String {
    DEFAULT_AVALANCHE_API_BASE.to_string()
}

fn default_language_key() -> String {
    DEFAULT_LANGUAGE_KEY.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_chunk_days() -> u32 {
    DEFAULT_CHUNK_DAYS
}

fn default_warning_horizon_days() -> u32 {
    DEFAULT_WARNING_HORIZON_DAYS
}

fn default_warehouse_dir() -> PathBuf {
    PathBuf::from("boreas")
}

fn default_max_workers() -> usize {
    num_cpus::get()
}

impl IngestConfig {
    /// Load the configuration from an optional file plus environment
    /// overrides, validating everything before any component sees it.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_file {
            builder = builder.add_source(config::File::from(path.to_path_buf()));
        } else {
            builder = builder.add_source(config::File::with_name("boreas").required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("BOREAS")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("hourly_params"),
        );

        let settings: IngestConfig = builder.build()?.try_deserialize()?;
        settings.check()?;
        Ok(settings)
    }

    /// Full startup validation: derive-level checks plus the semantic ones
    /// the derive cannot express.
    pub fn check(&self) -> Result<()> {
        self.validate()?;

        NaiveDateTime::parse_from_str(&self.start_date, MINUTE_FORMAT).map_err(|_| {
            IngestError::Config(format!(
                "start_date '{}' does not match {}",
                self.start_date, MINUTE_FORMAT
            ))
        })?;

        for (field, url) in [
            ("archive_api_base_url", &self.archive_api_base_url),
            ("forecast_api_base_url", &self.forecast_api_base_url),
            ("avalanche_api_base_url", &self.avalanche_api_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(IngestError::Config(format!(
                    "{} '{}' is not an http(s) URL",
                    field, url
                )));
            }
        }

        Ok(())
    }

    /// The configured initial watermark as a parsed timestamp. Infallible
    /// after `validate()` has run.
    pub fn start_watermark(&self) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&self.start_date, MINUTE_FORMAT)
            .unwrap_or_else(|_| NaiveDateTime::default())
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
            hourly_params: default_hourly_params(),
            timezone: default_timezone(),
            archive_api_base_url: default_archive_api_base(),
            forecast_api_base_url: default_forecast_api_base(),
            avalanche_api_base_url: default_avalanche_api_base(),
            language_key: default_language_key(),
            request_timeout_secs: default_request_timeout_secs(),
            chunk_days: default_chunk_days(),
            warning_horizon_days: default_warning_horizon_days(),
            warehouse_dir: default_warehouse_dir(),
            max_workers: default_max_workers(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = IngestConfig::default();
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_unparsable_start_date_is_rejected() {
        let config = IngestConfig {
            start_date: "10.01.2026".to_string(),
            ..Default::default()
        };
        assert!(config.check().is_err());
    }

    #[test]
    fn test_non_http_base_url_is_rejected() {
        let config = IngestConfig {
            archive_api_base_url: "ftp://archive.example".to_string(),
            ..Default::default()
        };
        assert!(config.check().is_err());
    }

    #[test]
    fn test_zero_chunk_days_is_rejected() {
        let config = IngestConfig {
            chunk_days: 0,
            ..Default::default()
        };
        assert!(config.check().is_err());
    }

    #[test]
    fn test_empty_hourly_params_is_rejected() {
        let config = IngestConfig {
            hourly_params: Vec::new(),
            ..Default::default()
        };
        assert!(config.check().is_err());
    }

    #[test]
    fn test_start_watermark_parses_default() {
        let config = IngestConfig::default();
        let ts = config.start_watermark();
        assert_eq!(ts.format("%Y-%m-%dT%H:%M").to_string(), "2026-01-10T00:00");
    }
}
