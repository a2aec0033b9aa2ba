//! Background congestion refresh.
//!
//! Each cycle fans out one fetch per monitoring area with bounded parallelism,
//! waits for all of them, and writes successful readings into the cache.
//! Failed areas keep whatever sample they had.

use std::sync::Arc;
use std::time::Duration;

use common::{CongestionFeed, CongestionSample, Error, MonitoringArea};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CongestionCache;
use crate::catalog::SharedCatalog;

/// Outcome tally of one refresh cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub updated: usize,
    pub failed: usize,
    pub unknown_area: usize,
    pub skipped_in_flight: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AreaOutcome {
    Updated,
    Failed,
    UnknownArea,
    SkippedInFlight,
}

impl RefreshReport {
    fn record(&mut self, outcome: AreaOutcome) {
        match outcome {
            AreaOutcome::Updated => self.updated += 1,
            AreaOutcome::Failed => self.failed += 1,
            AreaOutcome::UnknownArea => self.unknown_area += 1,
            AreaOutcome::SkippedInFlight => self.skipped_in_flight += 1,
        }
    }
}

/// Owns write access to the congestion cache.
pub struct CongestionRefresher<F: ?Sized> {
    feed: Arc<F>,
    cache: Arc<CongestionCache>,
    catalog: SharedCatalog,
    max_concurrent: usize,
    fetch_timeout: Duration,
}

impl<F: CongestionFeed + ?Sized + 'static> CongestionRefresher<F> {
    pub fn new(
        feed: Arc<F>,
        cache: Arc<CongestionCache>,
        catalog: SharedCatalog,
        max_concurrent: usize,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            feed,
            cache,
            catalog,
            max_concurrent: max_concurrent.max(1),
            fetch_timeout,
        }
    }

    /// Run one full cycle over every monitoring area in the current catalog.
    pub async fn refresh_all(&self) -> RefreshReport {
        let catalog = self.catalog.load_full();
        let areas: &[MonitoringArea] = &catalog.areas;

        let outcomes: Vec<AreaOutcome> = stream::iter(areas.iter().cloned())
            .map(|area| async move { self.refresh_area(&area).await })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mut report = RefreshReport::default();
        for outcome in outcomes {
            report.record(outcome);
        }

        info!(
            "Congestion refresh: updated={} failed={} unknown_area={} skipped_in_flight={} cached={}",
            report.updated,
            report.failed,
            report.unknown_area,
            report.skipped_in_flight,
            self.cache.len()
        );

        report
    }

    async fn refresh_area(&self, area: &MonitoringArea) -> AreaOutcome {
        let Some(_claim) = self.cache.claim_fetch(&area.name) else {
            debug!("{}: fetch already in flight, skipping", area.name);
            return AreaOutcome::SkippedInFlight;
        };

        let result = match tokio::time::timeout(self.fetch_timeout, self.feed.fetch(&area.name)).await {
            Ok(result) => result,
            Err(_) => Err(Error::FeedUnavailable {
                area: area.name.clone(),
                reason: format!("timed out after {:?}", self.fetch_timeout),
            }),
        };

        let reading = match result {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Failed to refresh congestion for {}: {}", area.name, e);
                return AreaOutcome::Failed;
            }
        };

        // Datasets may have been reloaded while the fetch was in flight.
        if !self.catalog.load().has_area(&reading.area_name) {
            let e = Error::UnknownArea(reading.area_name.clone());
            warn!("Dropping reading requested for {}: {}", area.name, e);
            return AreaOutcome::UnknownArea;
        }

        // Only the claimed area may be written by this fetch.
        if reading.area_name != area.name {
            let e = Error::FeedMalformed {
                area: area.name.clone(),
                reason: format!("reading is for {}", reading.area_name),
            };
            warn!("Failed to refresh congestion for {}: {}", area.name, e);
            return AreaOutcome::Failed;
        }

        let sample = CongestionSample::from(reading);
        debug!(
            "{}: {} (score {}) observed {}",
            sample.area,
            sample.level.as_str(),
            sample.score,
            sample.observed_at
        );
        self.cache.insert(sample);
        AreaOutcome::Updated
    }

    /// Spawn the detached refresh loop: one cycle immediately, then one per
    /// `interval`. A cycle that overruns delays the next tick rather than
    /// bunching ticks up.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                self.refresh_all().await;
            }
        })
    }
}
