//! Per-request orchestration: score, attribute congestion, rank.

use std::sync::Arc;

use common::config::ScoringConfig;
use common::geo::haversine_m;
use common::{Coordinate, Error};
use tracing::debug;

use crate::cache::CongestionCache;
use crate::catalog::{Catalog, SharedCatalog};
use crate::ranker::{rank, Recommendation, ScoredLocation};
use crate::scoring::distance_score;

/// Ranking knobs applied to every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingPolicy {
    pub acceptance_radius_m: f64,
    pub max_results: usize,
    pub fallback_congestion_score: f64,
}

impl From<&ScoringConfig> for RankingPolicy {
    fn from(cfg: &ScoringConfig) -> Self {
        Self {
            acceptance_radius_m: cfg.acceptance_radius_m,
            max_results: cfg.max_recommendations,
            fallback_congestion_score: cfg.fallback_congestion_score,
        }
    }
}

/// Stateless apart from the shared cache and catalog handles.
#[derive(Clone)]
pub struct RecommendationService {
    catalog: SharedCatalog,
    cache: Arc<CongestionCache>,
    policy: RankingPolicy,
}

impl RecommendationService {
    pub fn new(catalog: SharedCatalog, cache: Arc<CongestionCache>, policy: RankingPolicy) -> Self {
        Self {
            catalog,
            cache,
            policy,
        }
    }

    pub fn policy(&self) -> RankingPolicy {
        self.policy
    }

    /// Recommend restrooms for `user`. Fails only on an invalid coordinate.
    pub fn recommend(&self, user: Coordinate) -> Result<Recommendation, Error> {
        let user = user.validated()?;
        let candidates = self.score_candidates(user);

        debug!(
            "Scored {} restrooms for ({:.5}, {:.5})",
            candidates.len(),
            user.latitude,
            user.longitude
        );

        Ok(rank(
            candidates,
            self.policy.acceptance_radius_m,
            self.policy.max_results,
        ))
    }

    /// Score every restroom in the current catalog, in dataset order.
    pub fn score_candidates(&self, user: Coordinate) -> Vec<ScoredLocation> {
        let catalog = self.catalog.load();

        catalog
            .locations
            .iter()
            .enumerate()
            .map(|(idx, location)| {
                let d = haversine_m(user, location.coordinate());
                let congestion = self.congestion_for(&catalog, idx);
                ScoredLocation::new(location.clone(), d, distance_score(d), congestion)
            })
            .collect()
    }

    /// Mean score of the covering areas that have a cached sample.
    ///
    /// Uncovered restrooms get the fallback score; covered restrooms whose
    /// areas are all still unpopulated are unknown.
    fn congestion_for(&self, catalog: &Catalog, location_idx: usize) -> Option<f64> {
        let covering = catalog.coverage.areas_for(location_idx);
        if covering.is_empty() {
            return Some(self.policy.fallback_congestion_score);
        }

        let scores: Vec<f64> = covering
            .iter()
            .filter_map(|&area_idx| catalog.areas.get(area_idx))
            .filter_map(|area| self.cache.score(&area.name))
            .collect();

        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        }
    }
}
