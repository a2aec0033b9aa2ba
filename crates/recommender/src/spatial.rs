//! Spatial join between restrooms and monitoring areas.
//!
//! A restroom is covered by every monitoring area whose point lies within the
//! coverage radius of it. Coverage is collected over all areas before anything
//! downstream decides a restroom is uncovered.

use common::geo::haversine_m;
use common::{Location, MonitoringArea};

/// Per-location list of covering monitoring areas (indices into the area set).
#[derive(Debug, Clone, Default)]
pub struct CoverageMap {
    covering: Vec<Vec<usize>>,
    radius_m: f64,
}

impl CoverageMap {
    /// Build the join. O(locations × areas) haversine comparisons; the radius
    /// is inclusive.
    pub fn build(locations: &[Location], areas: &[MonitoringArea], radius_m: f64) -> Self {
        let covering = locations
            .iter()
            .map(|location| {
                let here = location.coordinate();
                areas
                    .iter()
                    .enumerate()
                    .filter(|(_, area)| haversine_m(area.coordinate(), here) <= radius_m)
                    .map(|(idx, _)| idx)
                    .collect()
            })
            .collect();

        Self { covering, radius_m }
    }

    /// Indices of the areas covering location `location_idx`; empty when none
    /// does or the index is out of range.
    pub fn areas_for(&self, location_idx: usize) -> &[usize] {
        self.covering
            .get(location_idx)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// Number of locations no area covers.
    pub fn uncovered_count(&self) -> usize {
        self.covering.iter().filter(|areas| areas.is_empty()).count()
    }
}
