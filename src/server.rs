//! HTTP API: recommendations, health, manual refresh and dataset reload.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use common::config::DatasetConfig;
use common::{CongestionFeed, Coordinate, Error};
use recommender::{
    CongestionCache, CongestionRefresher, Recommendation, RecommendationService, SharedCatalog,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dataset;

/// Everything the handlers share.
pub struct AppState {
    pub service: RecommendationService,
    pub cache: Arc<CongestionCache>,
    pub catalog: SharedCatalog,
    pub refresher: Arc<CongestionRefresher<dyn CongestionFeed>>,
    pub http: reqwest::Client,
    pub datasets: DatasetConfig,
    pub coverage_radius_m: f64,
    pub default_location: Coordinate,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/recommend", get(recommend))
        .route("/health", get(health))
        .route("/refresh", post(refresh))
        .route("/reload", post(reload))
        .with_state(state)
}

// --- Query / response shapes ---

#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Serialize)]
struct RankedRestroom {
    rank: usize,
    name: String,
    latitude: f64,
    longitude: f64,
    distance_m: f64,
    distance_score: u8,
    congestion_score: Option<f64>,
    final_score: f64,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum RecommendResponse {
    Ok {
        latitude: f64,
        longitude: f64,
        recommendations: Vec<RankedRestroom>,
    },
    NoneInRange {
        latitude: f64,
        longitude: f64,
        notice: String,
    },
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    locations: usize,
    areas: usize,
    uncovered_locations: usize,
    cached_samples: usize,
    stale_samples: usize,
    fetches_in_flight: usize,
    coverage_radius_m: f64,
    acceptance_radius_m: f64,
    cache_ttl_secs: u64,
    catalog_loaded_at: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// Human-readable notice for an empty recommendation.
pub fn none_in_range_notice(acceptance_radius_m: f64) -> String {
    format!("{:.0}m 이내에 추천할 화장실이 없습니다.", acceptance_radius_m)
}

fn resolve_coordinate(query: &RecommendQuery, default: Coordinate) -> Result<Coordinate, String> {
    match (query.latitude, query.longitude) {
        (Some(latitude), Some(longitude)) => Ok(Coordinate::new(latitude, longitude)),
        (None, None) => Ok(default),
        _ => Err("latitude and longitude must be given together".into()),
    }
}

// --- Handlers ---

async fn recommend(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecommendQuery>,
) -> Response {
    let user = match resolve_coordinate(&query, state.default_location) {
        Ok(user) => user,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };

    let body = match state.service.recommend(user) {
        Ok(Recommendation::Found(list)) => RecommendResponse::Ok {
            latitude: user.latitude,
            longitude: user.longitude,
            recommendations: list
                .into_iter()
                .enumerate()
                .map(|(i, s)| RankedRestroom {
                    rank: i + 1,
                    latitude: s.location.latitude,
                    longitude: s.location.longitude,
                    name: s.location.name,
                    distance_m: s.distance_m,
                    distance_score: s.distance_score,
                    congestion_score: s.congestion_score,
                    final_score: s.final_score,
                })
                .collect(),
        },
        Ok(Recommendation::NoneInRange) => RecommendResponse::NoneInRange {
            latitude: user.latitude,
            longitude: user.longitude,
            notice: none_in_range_notice(state.service.policy().acceptance_radius_m),
        },
        Err(e @ Error::InvalidCoordinate { .. }) => {
            return error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            warn!(error = %e, "Recommendation failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    Json(body).into_response()
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let catalog = state.catalog.load();
    Json(HealthResponse {
        locations: catalog.locations.len(),
        areas: catalog.areas.len(),
        uncovered_locations: catalog.coverage.uncovered_count(),
        cached_samples: state.cache.len(),
        stale_samples: state.cache.stale_count(),
        fetches_in_flight: state.cache.in_flight_count(),
        coverage_radius_m: catalog.coverage.radius_m(),
        acceptance_radius_m: state.service.policy().acceptance_radius_m,
        cache_ttl_secs: state.cache.ttl().as_secs(),
        catalog_loaded_at: catalog.loaded_at.to_rfc3339(),
    })
}

async fn refresh(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("Manual congestion refresh requested");
    Json(state.refresher.refresh_all().await)
}

async fn reload(State(state): State<Arc<AppState>>) -> Response {
    match dataset::load_catalog(&state.http, &state.datasets, state.coverage_radius_m).await {
        Ok(catalog) => {
            let body = serde_json::json!({
                "locations": catalog.locations.len(),
                "areas": catalog.areas.len(),
                "uncovered_locations": catalog.coverage.uncovered_count(),
            });
            state.catalog.store(Arc::new(catalog));
            info!("Datasets reloaded");
            Json(body).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Dataset reload failed, keeping current datasets");
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{FixedOffset, TimeZone};
    use common::{CongestionLevel, FeedReading};
    use recommender::{new_shared_catalog, Catalog, RankingPolicy};
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;
    use tower::ServiceExt;

    /// Every area reports "보통".
    struct NormalFeed;

    #[async_trait]
    impl CongestionFeed for NormalFeed {
        async fn fetch(&self, area_name: &str) -> Result<FeedReading, Error> {
            Ok(FeedReading {
                area_name: area_name.to_string(),
                observed_at: FixedOffset::east_opt(9 * 3600)
                    .unwrap()
                    .with_ymd_and_hms(2023, 6, 1, 14, 30, 0)
                    .unwrap(),
                level: CongestionLevel::Normal,
            })
        }
    }

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn state(catalog: Catalog, datasets: DatasetConfig) -> Arc<AppState> {
        let cache = Arc::new(CongestionCache::new(Duration::from_secs(3600)));
        let catalog = new_shared_catalog(catalog);
        let feed: Arc<dyn CongestionFeed> = Arc::new(NormalFeed);
        let refresher = Arc::new(CongestionRefresher::new(
            feed,
            cache.clone(),
            catalog.clone(),
            4,
            Duration::from_secs(1),
        ));
        let policy = RankingPolicy {
            acceptance_radius_m: 500.0,
            max_results: 3,
            fallback_congestion_score: 6.0,
        };

        Arc::new(AppState {
            service: RecommendationService::new(catalog.clone(), cache.clone(), policy),
            cache,
            catalog,
            refresher,
            http: reqwest::Client::new(),
            datasets,
            coverage_radius_m: 1000.0,
            default_location: Coordinate::new(37.5, 126.9),
        })
    }

    fn sample_catalog() -> Catalog {
        Catalog::new(
            vec![
                common::Location {
                    name: "near".into(),
                    latitude: 37.5001,
                    longitude: 126.9,
                },
                common::Location {
                    name: "far".into(),
                    latitude: 37.6,
                    longitude: 127.1,
                },
            ],
            vec![common::MonitoringArea {
                name: "zone".into(),
                latitude: 37.5,
                longitude: 126.9,
            }],
            1000.0,
        )
    }

    fn unused_datasets() -> DatasetConfig {
        DatasetConfig {
            locations: "/nonexistent/toilets.csv".into(),
            areas: "/nonexistent/areas.csv".into(),
        }
    }

    async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_recommend_uses_default_location() {
        let app = router(state(sample_catalog(), unused_datasets()));
        let (status, body) = call(app, "GET", "/recommend").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["latitude"], 37.5);
        let recs = body["recommendations"].as_array().unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0]["rank"], 1);
        assert_eq!(recs[0]["name"], "near");
        assert_eq!(recs[0]["distance_score"], 10);
        // Covered but never refreshed.
        assert!(recs[0]["congestion_score"].is_null());
    }

    #[tokio::test]
    async fn test_recommend_none_in_range() {
        let app = router(state(sample_catalog(), unused_datasets()));
        let (status, body) = call(app, "GET", "/recommend?latitude=35.1&longitude=129.0").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "none_in_range");
        assert!(body["notice"].as_str().unwrap().starts_with("500m"));
    }

    #[tokio::test]
    async fn test_recommend_rejects_half_coordinate() {
        let app = router(state(sample_catalog(), unused_datasets()));
        let (status, body) = call(app, "GET", "/recommend?latitude=37.5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("together"));
    }

    #[tokio::test]
    async fn test_recommend_rejects_out_of_range() {
        let app = router(state(sample_catalog(), unused_datasets()));
        let (status, _) = call(app, "GET", "/recommend?latitude=137.5&longitude=126.9").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_refresh_then_health() {
        let state = state(sample_catalog(), unused_datasets());

        let (status, report) = call(router(state.clone()), "POST", "/refresh").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["updated"], 1);
        assert_eq!(report["failed"], 0);

        let (_, health) = call(router(state.clone()), "GET", "/health").await;
        assert_eq!(health["locations"], 2);
        assert_eq!(health["areas"], 1);
        assert_eq!(health["uncovered_locations"], 1);
        assert_eq!(health["cached_samples"], 1);
        assert_eq!(health["stale_samples"], 0);

        let (_, body) = call(router(state), "GET", "/recommend").await;
        assert_eq!(body["recommendations"][0]["congestion_score"], 5.0);
        assert_eq!(body["recommendations"][0]["final_score"], 5.0);
    }

    #[tokio::test]
    async fn test_reload_swaps_datasets() {
        let toilets = csv_file("name,latitude,longitude\na,37.5,126.9\nb,37.5002,126.9\nc,37.5003,126.9\n");
        let areas = csv_file("name,latitude,longitude\nzone,37.5,126.9\nzone-2,37.51,126.9\n");
        let datasets = DatasetConfig {
            locations: toilets.path().to_string_lossy().into_owned(),
            areas: areas.path().to_string_lossy().into_owned(),
        };
        let state = state(sample_catalog(), datasets);

        let (status, body) = call(router(state.clone()), "POST", "/reload").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["locations"], 3);
        assert_eq!(state.catalog.load().areas.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_current_datasets() {
        let state = state(sample_catalog(), unused_datasets());

        let (status, body) = call(router(state.clone()), "POST", "/reload").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("Dataset error"));
        assert_eq!(state.catalog.load().locations.len(), 2);
    }
}
