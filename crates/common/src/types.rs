//! Domain types shared across the workspace.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::Error;

// ── Coordinates & datasets ────────────────────────────────────────────

/// A resolved requester coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Reject NaN, infinities and out-of-range degrees.
    pub fn validated(self) -> Result<Self, Error> {
        let ok = self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude);
        if ok {
            Ok(self)
        } else {
            Err(Error::InvalidCoordinate {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

/// A public restroom from the location dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// A named zone with a live occupancy feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringArea {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl MonitoringArea {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

// ── Congestion ────────────────────────────────────────────────────────

/// Crowding level reported by the real-time population feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CongestionLevel {
    Low,
    Normal,
    SlightlyCrowded,
    Crowded,
}

impl CongestionLevel {
    /// Map the feed's Korean label (`AREA_CONGEST_LVL`) to a level.
    pub fn from_feed_label(label: &str) -> Option<Self> {
        match label.trim() {
            "여유" => Some(Self::Low),
            "보통" => Some(Self::Normal),
            "약간 붐빔" => Some(Self::SlightlyCrowded),
            "붐빔" => Some(Self::Crowded),
            _ => None,
        }
    }

    /// Congestion penalty on the 0–10 scale.
    pub fn score(self) -> u8 {
        match self {
            Self::Low => 3,
            Self::Normal => 5,
            Self::SlightlyCrowded => 8,
            Self::Crowded => 10,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::SlightlyCrowded => "slightly_crowded",
            Self::Crowded => "crowded",
        }
    }
}

/// One successful answer from the congestion feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedReading {
    pub area_name: String,
    pub observed_at: DateTime<FixedOffset>,
    pub level: CongestionLevel,
}

/// A scored congestion observation for one area. Replaced, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CongestionSample {
    pub area: String,
    pub observed_at: DateTime<FixedOffset>,
    pub level: CongestionLevel,
    pub score: u8,
}

impl From<FeedReading> for CongestionSample {
    fn from(reading: FeedReading) -> Self {
        Self {
            score: reading.level.score(),
            area: reading.area_name,
            observed_at: reading.observed_at,
            level: reading.level,
        }
    }
}
