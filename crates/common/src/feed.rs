//! Seam between the refresher and whatever serves live congestion readings.

use async_trait::async_trait;

use crate::{Error, FeedReading};

/// A source of real-time congestion readings keyed by monitoring-area name.
#[async_trait]
pub trait CongestionFeed: Send + Sync {
    /// Fetch the current reading for one area.
    ///
    /// Implementations report transport problems as `Error::FeedUnavailable`
    /// and payload problems as `Error::FeedMalformed`.
    async fn fetch(&self, area_name: &str) -> Result<FeedReading, Error>;
}
