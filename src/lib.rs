//! GitHub roaster: fetches a GitHub profile, asks Gemini for a roast, counts usage.
//! Main library: component wiring, router, server loop.

pub mod client;
pub mod config;
pub mod counter;
pub mod metrics;
pub mod profile;
pub mod roast;
pub mod routes;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, warn};

use config::AppConfig;
use counter::UsageCounter;
use metrics::MetricsRegistry;
use profile::cache::ProfileCache;
use profile::github::GithubClient;
use profile::ProfileFetcher;
use roast::gemini::{mask_key, GeminiClient};
use roast::RoastGenerator;

/// Shared state handed to every handler.
pub struct AppState {
    pub fetcher: ProfileFetcher,
    pub roaster: RoastGenerator,
    pub counter: Arc<dyn UsageCounter>,
    pub metrics: Arc<MetricsRegistry>,
}

impl AppState {
    /// Build every component from configuration. Missing credentials are not fatal
    /// here; the affected endpoint reports them per request.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let metrics = Arc::new(MetricsRegistry::new());

        if config.github_token.is_none() {
            warn!("GITHUB_TOKEN not set, profile lookups will fail until configured");
        }
        let github = GithubClient::new(
            config.github_token.clone(),
            &config.github_api_url,
            &config.contributions_api_url,
            config.upstream_timeout,
            Arc::clone(&metrics),
        )?;

        match &config.gemini_api_key {
            Some(key) => info!(key = %mask_key(key), model = %config.gemini_model, "Gemini client initialized"),
            None => warn!("GEMINI_API_KEY not set, roast generation will fail until configured"),
        }
        let gemini = GeminiClient::new(
            config.gemini_api_key.clone(),
            &config.gemini_api_url,
            &config.gemini_model,
            config.upstream_timeout,
            Arc::clone(&metrics),
        )?;

        let counter = counter::from_config(config)?;
        info!(deploy_env = %config.deploy_env, "usage counter ready");

        Ok(Self {
            fetcher: ProfileFetcher::new(
                Arc::new(github),
                Arc::new(ProfileCache::with_default_ttl()),
                Arc::clone(&metrics),
            ),
            roaster: RoastGenerator::new(Arc::new(gemini), Arc::clone(&metrics)),
            counter,
            metrics,
        })
    }
}

/// All routes with request tracing.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/github-profile", post(routes::github_profile))
        .route("/api/generate-roast", post(routes::generate_roast))
        .route(
            "/api/user-count",
            get(routes::read_user_count).post(routes::increment_user_count),
        )
        .route("/api/metrics", get(routes::metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(
            |req: &axum::http::Request<axum::body::Body>| {
                info_span!(
                    "request",
                    request_id = %uuid::Uuid::new_v4(),
                    method = %req.method(),
                    uri = %req.uri(),
                )
            },
        ))
}

/// Serve until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let app = build_router(state);
    if let Ok(addr) = listener.local_addr() {
        info!("github-roaster listening on http://{addr}");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

/// Build state from `config`, bind, and serve until `shutdown` is cancelled.
pub async fn run(config: AppConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_config(&config)?);
    let listener = TcpListener::bind(&config.bind_addr).await?;
    serve(listener, state, shutdown).await?;
    info!("github-roaster stopped");
    Ok(())
}
