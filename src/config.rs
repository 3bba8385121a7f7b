//! Configuration loader — merges env vars, .env file, and a TOML file.

use std::path::Path;

use common::config::StoreConfig;
use common::Error;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

fn parse_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer >= 0")))
}

fn validate_config(config: &StoreConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    for (idx, airport) in config.airports.iter().enumerate() {
        if airport.iata.trim().is_empty() {
            issues.push(format!("airports[{idx}].iata must not be empty"));
        }
        if !(-90.0..=90.0).contains(&airport.latitude) {
            issues.push(format!("airports[{idx}].latitude must be in [-90, 90]"));
        }
        if !(-180.0..=180.0).contains(&airport.longitude) {
            issues.push(format!("airports[{idx}].longitude must be in [-180, 180]"));
        }
    }

    if config.retry.max_attempts == Some(0) {
        issues.push("retry.max_attempts must be > 0 (omit it to retry forever)".into());
    }
    if config.stats.recent_window_secs == 0 {
        issues.push("stats.recent_window_secs must be > 0".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

fn read_config_file(path: &Path) -> Result<StoreConfig, Error> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;
    toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Load store configuration.
///
/// An explicit `path` must exist. Without one, `config.toml` in the working
/// directory is used if present, otherwise defaults.
pub fn load_config(path: Option<&Path>) -> Result<StoreConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Defaults, replaced by the TOML file when there is one.
    let mut config = match path {
        Some(explicit) => read_config_file(explicit)?,
        None => {
            let fallback = Path::new(DEFAULT_CONFIG_PATH);
            if fallback.exists() {
                read_config_file(fallback)?
            } else {
                StoreConfig::default()
            }
        }
    };

    // 3. Environment overrides (highest priority).
    if let Ok(raw) = std::env::var("WEATHER_RETRY_BACKOFF_MS") {
        config.retry.backoff_ms = parse_u64(&raw, "WEATHER_RETRY_BACKOFF_MS")?;
    }
    if let Ok(raw) = std::env::var("WEATHER_RETRY_MAX_ATTEMPTS") {
        let trimmed = raw.trim();
        config.retry.max_attempts = if trimmed.is_empty() {
            None
        } else {
            let parsed = trimmed.parse::<u32>().map_err(|_| {
                Error::Config("WEATHER_RETRY_MAX_ATTEMPTS must be an integer > 0".into())
            })?;
            Some(parsed)
        };
    }
    if let Ok(raw) = std::env::var("WEATHER_RECENT_WINDOW_SECS") {
        config.stats.recent_window_secs = parse_u64(&raw, "WEATHER_RECENT_WINDOW_SECS")?;
    }

    validate_config(&config)?;

    Ok(config)
}
