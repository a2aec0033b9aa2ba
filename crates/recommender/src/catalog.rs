//! Static datasets plus the spatial join computed from them.
//!
//! The three are swapped as one unit so a request never pairs a join with
//! datasets from a different load.

use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use common::{Location, MonitoringArea};
use tracing::info;

use crate::spatial::CoverageMap;

/// One generation of loaded datasets.
#[derive(Debug)]
pub struct Catalog {
    pub locations: Vec<Location>,
    pub areas: Vec<MonitoringArea>,
    pub coverage: CoverageMap,
    area_names: HashSet<String>,
    pub loaded_at: DateTime<Utc>,
}

impl Catalog {
    pub fn new(locations: Vec<Location>, areas: Vec<MonitoringArea>, coverage_radius_m: f64) -> Self {
        let coverage = CoverageMap::build(&locations, &areas, coverage_radius_m);
        let area_names = areas.iter().map(|a| a.name.clone()).collect();

        info!(
            "Catalog built: {} restrooms, {} monitoring areas, {} uncovered (radius {:.0}m)",
            locations.len(),
            areas.len(),
            coverage.uncovered_count(),
            coverage_radius_m
        );

        Self {
            locations,
            areas,
            coverage,
            area_names,
            loaded_at: Utc::now(),
        }
    }

    pub fn has_area(&self, name: &str) -> bool {
        self.area_names.contains(name)
    }
}

/// Atomically swappable catalog shared by the request path and the refresher.
pub type SharedCatalog = Arc<ArcSwap<Catalog>>;

/// Wrap an initial catalog for sharing.
pub fn new_shared_catalog(catalog: Catalog) -> SharedCatalog {
    Arc::new(ArcSwap::from_pointee(catalog))
}
