//! In-memory congestion cache keyed by monitoring-area name.
//!
//! Uses `DashMap` so the request path only ever takes a shard read lock for
//! the length of one clone; writes come from the refresher alone and never
//! hold a lock across I/O.

use std::time::{Duration, Instant};

use common::CongestionSample;
use dashmap::{DashMap, DashSet};

/// A cached sample with its expiry.
#[derive(Debug, Clone)]
pub struct CongestionEntry {
    pub sample: CongestionSample,
    pub fetched_at: Instant,
    pub expires_at: Instant,
}

impl CongestionEntry {
    /// Past TTL. Stale entries are still served until replaced.
    pub fn is_stale(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Thread-safe congestion store plus the single-flight claims for fetches.
#[derive(Debug)]
pub struct CongestionCache {
    entries: DashMap<String, CongestionEntry>,
    in_flight: DashSet<String>,
    ttl: Duration,
}

impl CongestionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            in_flight: DashSet::new(),
            ttl,
        }
    }

    /// Current entry for an area, fresh or stale. `None` means never populated.
    pub fn get(&self, area: &str) -> Option<CongestionEntry> {
        self.entries.get(area).map(|e| e.clone())
    }

    /// Congestion score for an area, if any sample has been cached.
    pub fn score(&self, area: &str) -> Option<f64> {
        self.entries.get(area).map(|e| f64::from(e.sample.score))
    }

    /// Store a sample, replacing whatever was cached for its area.
    pub fn insert(&self, sample: CongestionSample) {
        let now = Instant::now();
        self.entries.insert(
            sample.area.clone(),
            CongestionEntry {
                sample,
                fetched_at: now,
                expires_at: now + self.ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stale_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_stale()).count()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Claim the right to fetch `area`. Returns `None` if another fetch for
    /// the same area is already in flight; the claim is released on drop.
    pub fn claim_fetch(&self, area: &str) -> Option<FetchClaim<'_>> {
        if self.in_flight.insert(area.to_string()) {
            Some(FetchClaim {
                cache: self,
                area: area.to_string(),
            })
        } else {
            None
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}

/// Single-flight claim on one area's fetch.
#[derive(Debug)]
pub struct FetchClaim<'a> {
    cache: &'a CongestionCache,
    area: String,
}

impl Drop for FetchClaim<'_> {
    fn drop(&mut self) {
        self.cache.in_flight.remove(&self.area);
    }
}
