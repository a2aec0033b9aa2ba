//! toilet-finder: Seoul public restroom recommender.
//!
//! Single-binary Tokio application that:
//! 1. Loads restroom and monitoring-area datasets
//! 2. Refreshes live congestion per area on a timer
//! 3. Ranks nearby restrooms by distance and congestion
//! 4. Serves recommendations over HTTP

mod config;
mod dataset;
mod server;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use citydata_client::CitydataClient;
use common::{AppConfig, CongestionFeed, Coordinate};
use recommender::{
    new_shared_catalog, CongestionCache, CongestionRefresher, RankingPolicy, Recommendation,
    RecommendationService,
};

/// Seoul public restroom recommender
#[derive(Parser)]
#[command(name = "toilet-finder", about = "Recommend nearby, uncrowded public restrooms in Seoul")]
struct Cli {
    /// Config file path.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Run one refresh cycle, print one recommendation and exit.
    #[arg(long)]
    once: bool,

    /// Requester latitude for --once (defaults to the configured location).
    #[arg(long, requires = "longitude", allow_negative_numbers = true)]
    latitude: Option<f64>,

    /// Requester longitude for --once.
    #[arg(long, requires = "latitude", allow_negative_numbers = true)]
    longitude: Option<f64>,

    /// Fetch a single monitoring area from the feed, print it and exit.
    #[arg(long, value_name = "AREA", conflicts_with = "once")]
    check_feed: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "toilet_finder=info,recommender=info,citydata_client=info".into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    info!("toilet-finder starting up...");

    // Load configuration.
    let cfg = match config::load_config(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    log_config(&cfg);

    let feed = match CitydataClient::new(&cfg.feed) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to build feed client: {}", e);
            std::process::exit(1);
        }
    };

    // ── Check-feed mode ──────────────────────────────────────────────
    if let Some(area) = cli.check_feed.as_deref() {
        match feed.fetch(area).await {
            Ok(reading) => {
                info!(
                    "{}: {} (score {}) observed {}",
                    reading.area_name,
                    reading.level.as_str(),
                    reading.level.score(),
                    reading.observed_at
                );
                println!(
                    "{}\t{}\t{}\t{}",
                    reading.area_name,
                    reading.level.as_str(),
                    reading.level.score(),
                    reading.observed_at.format("%Y-%m-%d %H:%M")
                );
            }
            Err(e) => {
                error!("Feed check failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if let Err(e) = run(cli, cfg, feed).await {
        error!("{:#}", e);
        std::process::exit(1);
    }

    info!("toilet-finder shut down.");
}

fn log_config(cfg: &AppConfig) {
    info!("Feed: {}", cfg.feed.base_url);
    info!("Datasets: locations={} areas={}", cfg.datasets.locations, cfg.datasets.areas);
    info!(
        "Scoring: coverage={:.0}m fallback={} acceptance={:.0}m k={}",
        cfg.scoring.coverage_radius_m,
        cfg.scoring.fallback_congestion_score,
        cfg.scoring.acceptance_radius_m,
        cfg.scoring.max_recommendations
    );
    info!(
        "Timing: refresh every {}s, ttl {}s, {} concurrent fetches, {} req/s",
        cfg.timing.refresh_interval_secs,
        cfg.timing.cache_ttl_secs,
        cfg.feed.max_concurrent_fetches,
        cfg.feed.requests_per_second
    );
}

async fn run(cli: Cli, cfg: AppConfig, feed: Arc<CitydataClient>) -> anyhow::Result<()> {
    // ── Shared state ─────────────────────────────────────────────────
    let http = reqwest::Client::new();
    let catalog = dataset::load_catalog(&http, &cfg.datasets, cfg.scoring.coverage_radius_m)
        .await
        .context("failed to load datasets")?;
    let catalog = new_shared_catalog(catalog);

    let cache = Arc::new(CongestionCache::new(Duration::from_secs(
        cfg.timing.cache_ttl_secs,
    )));
    let feed: Arc<dyn CongestionFeed> = feed;
    let refresher = Arc::new(CongestionRefresher::new(
        feed,
        cache.clone(),
        catalog.clone(),
        cfg.feed.max_concurrent_fetches,
        Duration::from_secs(cfg.feed.request_timeout_secs),
    ));
    let service = RecommendationService::new(
        catalog.clone(),
        cache.clone(),
        RankingPolicy::from(&cfg.scoring),
    );

    // ── Once mode ────────────────────────────────────────────────────
    if cli.once {
        refresher.refresh_all().await;
        let user = match (cli.latitude, cli.longitude) {
            (Some(latitude), Some(longitude)) => Coordinate::new(latitude, longitude),
            _ => cfg.default_location,
        };
        print_recommendation(&service, user)?;
        return Ok(());
    }

    // ── Long-lived tasks ─────────────────────────────────────────────
    let refresh_handle = refresher
        .clone()
        .spawn(Duration::from_secs(cfg.timing.refresh_interval_secs));

    let state = Arc::new(server::AppState {
        service,
        cache,
        catalog,
        refresher,
        http,
        datasets: cfg.datasets.clone(),
        coverage_radius_m: cfg.scoring.coverage_radius_m,
        default_location: cfg.default_location,
    });
    let listener = tokio::net::TcpListener::bind(&cfg.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.server.bind_addr))?;
    info!("Listening on {}", cfg.server.bind_addr);
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, server::router(state)).await
    });

    // ── Wait for shutdown ────────────────────────────────────────────
    info!("toilet-finder is running. Press Ctrl+C to stop.");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        r = refresh_handle => {
            error!("Refresh task exited: {:?}", r);
        }
        r = server_handle => {
            error!("HTTP server exited: {:?}", r);
        }
    }

    Ok(())
}

fn print_recommendation(service: &RecommendationService, user: Coordinate) -> anyhow::Result<()> {
    let recommendation = service
        .recommend(user)
        .context("cannot recommend for the given coordinate")?;

    match recommendation {
        Recommendation::Found(list) => {
            for (i, s) in list.iter().enumerate() {
                let congestion = s
                    .congestion_score
                    .map(|c| format!("{:.1}", c))
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{} : {} ({:.0}m, congestion {}, score {:.1})",
                    i + 1,
                    s.location.name,
                    s.distance_m,
                    congestion,
                    s.final_score
                );
            }
        }
        Recommendation::NoneInRange => {
            println!(
                "{}",
                server::none_in_range_notice(service.policy().acceptance_radius_m)
            );
        }
    }
    Ok(())
}
