//! Configuration loader: merges env vars, .env file, and config.toml.

use common::{AppConfig, Error};
use std::path::Path;

fn parse_positive_f64(raw: &str, env_name: &str) -> Result<f64, Error> {
    let parsed = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::Config(format!("{env_name} must be a number > 0")))?;
    if !parsed.is_finite() || parsed <= 0.0 {
        return Err(Error::Config(format!("{env_name} must be a number > 0")));
    }
    Ok(parsed)
}

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

pub fn validate_config(config: &AppConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.feed.api_key.trim().is_empty() {
        issues.push("SEOUL_API_KEY is required (set in .env, environment, or feed.api_key)".into());
    }
    if config.feed.base_url.trim().is_empty() {
        issues.push("feed.base_url must not be empty".into());
    }
    if config.feed.request_timeout_secs == 0 {
        issues.push("feed.request_timeout_secs must be > 0".into());
    }
    if config.feed.max_concurrent_fetches == 0 {
        issues.push("feed.max_concurrent_fetches must be > 0".into());
    }
    if config.feed.requests_per_second == 0 {
        issues.push("feed.requests_per_second must be > 0".into());
    }

    if config.datasets.locations.trim().is_empty() {
        issues.push("datasets.locations must not be empty".into());
    }
    if config.datasets.areas.trim().is_empty() {
        issues.push("datasets.areas must not be empty".into());
    }

    if !(config.scoring.coverage_radius_m > 0.0) {
        issues.push("scoring.coverage_radius_m must be > 0".into());
    }
    if !(0.0..=10.0).contains(&config.scoring.fallback_congestion_score) {
        issues.push("scoring.fallback_congestion_score must be in [0,10]".into());
    }
    if !(config.scoring.acceptance_radius_m > 0.0) {
        issues.push("scoring.acceptance_radius_m must be > 0".into());
    }
    if config.scoring.max_recommendations == 0 {
        issues.push("scoring.max_recommendations must be > 0".into());
    }

    if config.timing.refresh_interval_secs == 0 {
        issues.push("timing.refresh_interval_secs must be > 0".into());
    }
    if config.timing.cache_ttl_secs == 0 {
        issues.push("timing.cache_ttl_secs must be > 0".into());
    }

    if config.default_location.validated().is_err() {
        issues.push("default_location must be a valid latitude/longitude".into());
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

/// Load configuration from environment and an optional config file.
pub fn load_config(config_path: &Path) -> Result<AppConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Defaults, then config.toml if present.
    let mut config = if config_path.exists() {
        let contents = std::fs::read_to_string(config_path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", config_path.display(), e))
        })?;
        toml::from_str(&contents).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", config_path.display(), e))
        })?
    } else {
        AppConfig::default()
    };

    // 3. Environment overrides (highest priority).
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;

    validate_config(&config)?;

    Ok(config)
}

fn apply_env_overrides(
    config: &mut AppConfig,
    var: impl Fn(&str) -> Option<String>,
) -> Result<(), Error> {
    if let Some(key) = var("SEOUL_API_KEY") {
        config.feed.api_key = key.trim().to_string();
    }
    if let Some(url) = var("FEED_BASE_URL") {
        config.feed.base_url = url.trim().to_string();
    }
    if let Some(src) = var("LOCATIONS_SOURCE") {
        config.datasets.locations = src.trim().to_string();
    }
    if let Some(src) = var("AREAS_SOURCE") {
        config.datasets.areas = src.trim().to_string();
    }
    if let Some(addr) = var("BIND_ADDR") {
        config.server.bind_addr = addr.trim().to_string();
    }
    if let Some(raw) = var("ACCEPTANCE_RADIUS_M") {
        config.scoring.acceptance_radius_m = parse_positive_f64(&raw, "ACCEPTANCE_RADIUS_M")?;
    }
    if let Some(raw) = var("REFRESH_INTERVAL_SECS") {
        config.timing.refresh_interval_secs = parse_positive_u64(&raw, "REFRESH_INTERVAL_SECS")?;
    }
    Ok(())
}
