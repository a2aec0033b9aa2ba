//! Restroom recommendation engine.
//!
//! Scores restrooms by distance, attributes live congestion through monitoring
//! areas, and ranks the result.

pub mod cache;
pub mod catalog;
pub mod ranker;
pub mod refresh;
pub mod scoring;
pub mod service;
pub mod spatial;

pub use cache::{CongestionCache, CongestionEntry};
pub use catalog::{new_shared_catalog, Catalog, SharedCatalog};
pub use ranker::{rank, Recommendation, ScoredLocation};
pub use refresh::{CongestionRefresher, RefreshReport};
pub use scoring::distance_score;
pub use service::{RankingPolicy, RecommendationService};
pub use spatial::CoverageMap;
