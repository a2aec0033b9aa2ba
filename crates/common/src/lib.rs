//! Shared types, config, geo helpers and error definitions for toilet-finder.

pub mod config;
pub mod error;
pub mod feed;
pub mod geo;
pub mod types;

pub use config::AppConfig;
pub use error::Error;
pub use feed::CongestionFeed;
pub use types::*;

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
