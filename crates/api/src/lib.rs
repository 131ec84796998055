mod rate_limit;

use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use cardwise_cards::CardRepository;
use cardwise_engine::{QueryInput, QueryOrchestrator};
use cardwise_observability::AppMetrics;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::rate_limit::IpRateLimiter;

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<QueryOrchestrator>,
    pub metrics: Arc<AppMetrics>,
    pub api_key: String,
    pub limiter: IpRateLimiter,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    cards_loaded: usize,
    metrics: cardwise_observability::MetricsSnapshot,
}

#[derive(Debug, Serialize)]
struct CardSummary {
    id: String,
    display_name: String,
    aliases: Vec<String>,
    reward_currency: String,
}

pub fn build_app(data_dir: impl AsRef<Path>) -> Result<Router> {
    let metrics = AppMetrics::shared();
    let repository = Arc::new(
        CardRepository::from_data_dir(&data_dir).context("failed to load card definitions")?,
    );
    let orchestrator = Arc::new(QueryOrchestrator::new(repository, metrics.clone()));

    let api_key = env::var("CARDWISE_API_KEY").unwrap_or_else(|_| "dev-cardwise-key".to_string());
    let rate_limit_window = Duration::from_secs(
        env::var("CARDWISE_RATE_LIMIT_WINDOW_SECONDS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(60),
    );
    let rate_limit_max = env::var("CARDWISE_RATE_LIMIT_MAX")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(80);

    let state = ApiState {
        orchestrator,
        metrics,
        api_key,
        limiter: IpRateLimiter::new(rate_limit_window, rate_limit_max),
    };

    Ok(build_router(state))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/query", post(query))
        .route("/v1/cards", get(cards_list))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        cards_loaded: state.orchestrator.repository().stats().cards_loaded,
        metrics: state.metrics.snapshot(),
    };
    (StatusCode::OK, Json(payload))
}

async fn query(State(state): State<ApiState>, Json(input): Json<QueryInput>) -> Response {
    if input.text.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "empty_query",
                "message": "query text must not be empty"
            })),
        )
            .into_response();
    }

    let reply = state.orchestrator.handle_query(input);
    (StatusCode::OK, Json(reply)).into_response()
}

async fn cards_list(State(state): State<ApiState>) -> impl IntoResponse {
    let cards = state
        .orchestrator
        .repository()
        .cards()
        .iter()
        .map(|card| CardSummary {
            id: card.id.clone(),
            display_name: card.display_name.clone(),
            aliases: card.aliases.clone(),
            reward_currency: card.reward_currency.clone(),
        })
        .collect::<Vec<_>>();

    (StatusCode::OK, Json(cards))
}

async fn api_key_middleware(State(state): State<ApiState>, request: Request, next: Next) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let provided = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok());

    if provided != Some(state.api_key.as_str()) {
        tracing::warn!(path = %request.uri().path(), "rejected request with missing or bad api key");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "invalid_api_key"
            })),
        )
            .into_response();
    }

    next.run(request).await
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request,
    next: Next,
) -> Response {
    let client_key = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| "local".to_string());

    if !state.limiter.allow(&client_key) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": "rate_limited"
            })),
        )
            .into_response();
    }

    next.run(request).await
}
