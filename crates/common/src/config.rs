//! Service configuration types.

use serde::{Deserialize, Serialize};

use crate::types::Coordinate;

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Real-time congestion feed settings.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Where the two static datasets come from.
    #[serde(default)]
    pub datasets: DatasetConfig,

    /// Scoring and ranking policy.
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Timing parameters (seconds).
    #[serde(default)]
    pub timing: TimingConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Coordinate used when a request carries none.
    #[serde(default = "default_location")]
    pub default_location: Coordinate,
}

/// Seoul Open Data `citydata_ppltn` feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Base URL, without the API key segment.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Open API key (usually supplied via `SEOUL_API_KEY`).
    #[serde(default)]
    pub api_key: String,

    /// Per-call timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Max in-flight fetches during one refresh cycle.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_fetches: usize,

    /// Client-side rate limit.
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,
}

/// Dataset sources. Each is a filesystem path or an http(s) URL to a CSV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default = "default_locations_source")]
    pub locations: String,

    #[serde(default = "default_areas_source")]
    pub areas: String,
}

/// Scoring thresholds and limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Radius around a monitoring area within which a restroom is covered.
    #[serde(default = "default_coverage_radius")]
    pub coverage_radius_m: f64,

    /// Congestion score for restrooms no monitoring area covers.
    #[serde(default = "default_fallback_score")]
    pub fallback_congestion_score: f64,

    /// Max distance from the requester for a recommended restroom.
    #[serde(default = "default_acceptance_radius")]
    pub acceptance_radius_m: f64,

    /// Size of the ranked prefix the acceptance filter is applied to.
    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,
}

/// Timing configuration (all values in seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Interval between scheduled refresh cycles.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Age after which a cached sample counts as stale (still served).
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "http://openapi.seoul.go.kr:8088".into()
}
fn default_request_timeout() -> u64 {
    10
}
fn default_max_concurrent() -> usize {
    8
}
fn default_rps() -> u32 {
    5
}

fn default_locations_source() -> String {
    "https://roasample.cafe24.com/data/Seoul_toilet_location.csv".into()
}
fn default_areas_source() -> String {
    "https://roasample.cafe24.com/data/Seoul_location_113_lat_long.csv".into()
}

fn default_coverage_radius() -> f64 {
    1000.0
}
fn default_fallback_score() -> f64 {
    6.0
}
fn default_acceptance_radius() -> f64 {
    500.0
}
fn default_max_recommendations() -> usize {
    3
}

fn default_refresh_interval() -> u64 {
    3600
}
fn default_cache_ttl() -> u64 {
    3600
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".into()
}

fn default_location() -> Coordinate {
    Coordinate::new(37.5, 126.90)
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            request_timeout_secs: default_request_timeout(),
            max_concurrent_fetches: default_max_concurrent(),
            requests_per_second: default_rps(),
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            locations: default_locations_source(),
            areas: default_areas_source(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            coverage_radius_m: default_coverage_radius(),
            fallback_congestion_score: default_fallback_score(),
            acceptance_radius_m: default_acceptance_radius(),
            max_recommendations: default_max_recommendations(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            datasets: DatasetConfig::default(),
            scoring: ScoringConfig::default(),
            timing: TimingConfig::default(),
            server: ServerConfig::default(),
            default_location: default_location(),
        }
    }
}
