use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::RefreshConfig;
use crate::models::Snapshot;
use crate::services::{SnapshotCache, SnapshotCollector, SnapshotStore};
use crate::sources::narrative::NarrativeGenerator;

pub struct AppState {
    pub collector: Arc<SnapshotCollector>,
    pub store: Arc<SnapshotStore>,
    pub cache: Arc<SnapshotCache>,
    pub narrative: Option<Arc<dyn NarrativeGenerator>>,
    pub refresh: RefreshConfig,
}

#[derive(Debug, Deserialize)]
struct WeeklyParams {
    weeks: Option<usize>,
}

/// GET /snapshot/latest
async fn latest_snapshot(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    if let Some(snapshot) = state.cache.get() {
        return (StatusCode::OK, Json(json!(*snapshot)));
    }
    match state.store.latest().await {
        Ok(Some(snapshot)) => {
            state.cache.set(snapshot.clone());
            (StatusCode::OK, Json(json!(snapshot)))
        }
        Ok(None) => not_found("no snapshots yet"),
        Err(e) => internal_error(e),
    }
}

/// GET /snapshots/weekly?weeks=12
async fn weekly_snapshots(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WeeklyParams>,
) -> (StatusCode, Json<Value>) {
    let weeks = params.weeks.unwrap_or(12);
    match state.store.nearest_weekly(weeks).await {
        Ok(snapshots) => (StatusCode::OK, Json(json!(snapshots))),
        Err(e) => internal_error(e),
    }
}

/// GET /analysis/latest
async fn latest_analysis(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    match state.store.latest_analysis().await {
        Ok(Some(analysis)) => (StatusCode::OK, Json(json!(analysis))),
        Ok(None) => not_found("no analyses yet"),
        Err(e) => internal_error(e),
    }
}

/// GET /refresh - fetch fresh data unless the stored snapshot is recent.
async fn refresh(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    match state.store.latest().await {
        Ok(Some(existing)) => {
            let age = Utc::now() - existing.timestamp;
            if age.num_seconds() >= 0 && (age.num_seconds() as u64) < state.refresh.freshness_secs
            {
                return (
                    StatusCode::OK,
                    Json(json!({
                        "status": "cached",
                        "timestamp": existing.timestamp,
                    })),
                );
            }
        }
        Ok(None) => {}
        Err(e) => return internal_error(e),
    }

    match run_refresh(&state).await {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(json!({
                "status": "refreshed",
                "timestamp": snapshot.timestamp,
                "chains": snapshot.chains.len(),
            })),
        ),
        Err(e) => internal_error(e),
    }
}

/// GET /cron/daily - unconditional refresh, bearer-secret gated.
async fn cron_daily(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if !cron_authorized(&headers, &state.refresh.cron_secret) {
        return unauthorized();
    }

    tracing::info!("Daily cron: fetching fresh data");
    match run_refresh(&state).await {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": snapshot.timestamp,
                "chains": snapshot.chains.len(),
            })),
        ),
        Err(e) => internal_error(e),
    }
}

/// GET /cron/weekly - refresh plus analysis generation.
async fn cron_weekly(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if !cron_authorized(&headers, &state.refresh.cron_secret) {
        return unauthorized();
    }

    tracing::info!("Weekly cron: fetching fresh data");
    let snapshot = match run_refresh(&state).await {
        Ok(snapshot) => snapshot,
        Err(e) => return internal_error(e),
    };

    let Some(narrative) = state.narrative.as_ref() else {
        return (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "analysis": "skipped, no generator configured",
            })),
        );
    };

    // The week-ago point for comparison, if the series has one.
    let previous = match state.store.nearest_weekly(2).await {
        Ok(weekly) if weekly.len() >= 2 => Some(weekly[0].clone()),
        Ok(_) => None,
        Err(e) => return internal_error(e),
    };

    match narrative.generate(&snapshot, previous.as_ref()).await {
        Ok(analysis) => {
            if let Err(e) = state.store.append_analysis(analysis.clone()).await {
                return internal_error(e);
            }
            (
                StatusCode::OK,
                Json(json!({
                    "status": "ok",
                    "bullets": analysis.bullets.len(),
                })),
            )
        }
        Err(e) => internal_error(e),
    }
}

/// GET /health
async fn health() -> &'static str {
    "OK"
}

/// GET /stats
async fn stats(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let count = match state.store.count().await {
        Ok(count) => count,
        Err(e) => return internal_error(e),
    };
    (
        StatusCode::OK,
        Json(json!({
            "snapshots": count,
            "latest": state.cache.get().map(|s| s.timestamp),
        })),
    )
}

async fn run_refresh(
    state: &AppState,
) -> Result<Snapshot, Box<dyn std::error::Error + Send + Sync>> {
    let snapshot = state.collector.collect().await?;
    state.store.append(snapshot.clone()).await?;
    state.cache.set(snapshot.clone());
    tracing::info!(
        "✓ Refreshed: {} chains, stable TVL ${:.2}B",
        snapshot.chains.len(),
        snapshot.totals.stable_tvl / 1e9
    );
    Ok(snapshot)
}

fn cron_authorized(headers: &HeaderMap, secret: &Option<String>) -> bool {
    let Some(secret) = secret else {
        return true;
    };
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value == format!("Bearer {}", secret))
        .unwrap_or(false)
}

fn not_found(message: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({"error": message})))
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({"error": "Unauthorized"})))
}

fn internal_error<E: std::fmt::Display>(error: E) -> (StatusCode, Json<Value>) {
    tracing::error!("Request failed: {}", error);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"status": "error", "message": error.to_string()})),
    )
}

pub fn create_rest_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/snapshot/latest", get(latest_snapshot))
        .route("/snapshots/weekly", get(weekly_snapshots))
        .route("/analysis/latest", get(latest_analysis))
        .route("/refresh", get(refresh))
        .route("/cron/daily", get(cron_daily))
        .route("/cron/weekly", get(cron_weekly))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cron_gate_is_open_without_a_secret() {
        let headers = HeaderMap::new();
        assert!(cron_authorized(&headers, &None));
    }

    #[test]
    fn cron_gate_requires_the_exact_bearer_token() {
        let secret = Some("s3cret".to_string());
        let mut headers = HeaderMap::new();
        assert!(!cron_authorized(&headers, &secret));

        headers.insert(header::AUTHORIZATION, "Bearer wrong".parse().unwrap());
        assert!(!cron_authorized(&headers, &secret));

        headers.insert(header::AUTHORIZATION, "Bearer s3cret".parse().unwrap());
        assert!(cron_authorized(&headers, &secret));
    }
}
