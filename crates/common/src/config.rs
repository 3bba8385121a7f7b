//! Store configuration types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Airports registered at startup.
    #[serde(default = "default_airports")]
    pub airports: Vec<AirportConfig>,

    /// Optimistic merge retry behaviour.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Usage report parameters.
    #[serde(default)]
    pub stats: StatsConfig,
}

/// Seed entry for one airport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirportConfig {
    pub iata: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Retry policy for the compare-and-swap loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Pause between conflicting attempts (milliseconds).
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Give up after this many attempts. `None` retries forever.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl RetryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Usage report configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// A record counts as recent if updated within this many seconds.
    #[serde(default = "default_recent_window")]
    pub recent_window_secs: u64,
}

impl StatsConfig {
    /// Capped at a century.
    pub fn recent_window(&self) -> chrono::Duration {
        const MAX_WINDOW_SECS: u64 = 100 * 365 * 86_400;
        chrono::Duration::seconds(self.recent_window_secs.min(MAX_WINDOW_SECS) as i64)
    }
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_backoff_ms() -> u64 {
    10
}
fn default_recent_window() -> u64 {
    86_400
}

fn default_airports() -> Vec<AirportConfig> {
    vec![
        AirportConfig {
            iata: "BOS".into(),
            latitude: 42.364347,
            longitude: -71.005181,
        },
        AirportConfig {
            iata: "EWR".into(),
            latitude: 40.6925,
            longitude: -74.168667,
        },
        AirportConfig {
            iata: "JFK".into(),
            latitude: 40.639751,
            longitude: -73.778925,
        },
        AirportConfig {
            iata: "LGA".into(),
            latitude: 40.777245,
            longitude: -73.872608,
        },
        AirportConfig {
            iata: "MMU".into(),
            latitude: 40.79935,
            longitude: -74.4148747,
        },
    ]
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff_ms: default_backoff_ms(),
            max_attempts: None,
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            recent_window_secs: default_recent_window(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            airports: default_airports(),
            retry: RetryConfig::default(),
            stats: StatsConfig::default(),
        }
    }
}
