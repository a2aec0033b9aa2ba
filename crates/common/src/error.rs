//! Unified error type for toilet-finder.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Non-success status, network error or timeout from the congestion feed.
    #[error("Congestion feed unavailable for {area}: {reason}")]
    FeedUnavailable { area: String, reason: String },

    /// The feed answered but the payload is missing expected fields.
    #[error("Malformed congestion feed payload for {area}: {reason}")]
    FeedMalformed { area: String, reason: String },

    /// The feed referenced an area that is not in the monitoring-area dataset.
    #[error("Unknown monitoring area: {0}")]
    UnknownArea(String),

    #[error("Invalid coordinate: latitude={latitude}, longitude={longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

