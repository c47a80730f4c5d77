use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct LatencyConfig {
    /// Pause before a review is committed.
    pub review: Duration,
    /// Pause before a resource create or update is committed.
    pub upload: Duration,
}

impl LatencyConfig {
    pub fn none() -> Self {
        Self {
            review: Duration::ZERO,
            upload: Duration::ZERO,
        }
    }
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            review: Duration::from_millis(500),
            upload: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub bcrypt_cost: u32,
    pub latency: LatencyConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = LatencyConfig::default();
        let latency = LatencyConfig {
            review: env_millis("REVIEW_DELAY_MS").unwrap_or(defaults.review),
            upload: env_millis("UPLOAD_DELAY_MS").unwrap_or(defaults.upload),
        };
        Ok(Self {
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "data".into()).into(),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("APP_PORT")
                .ok()
                .map(|v| v.parse::<u16>())
                .transpose()?
                .unwrap_or(3000),
            bcrypt_cost: std::env::var("BCRYPT_COST")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(bcrypt::DEFAULT_COST),
            latency,
        })
    }

    /// Fast settings for tests and scripted use: no artificial delay, cheapest hash cost.
    pub fn local(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            host: "127.0.0.1".into(),
            port: 0,
            bcrypt_cost: 4,
            latency: LatencyConfig::none(),
        }
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
}
