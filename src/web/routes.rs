//! REST API routes for the admin server.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;

use crate::config::{HerdConfig, HerdConfigPatch};
use crate::engine::{HerdRecord, ResetSummary};
use crate::geo::GeoPoint;
use crate::stats::HerdStats;
use crate::strays::StrayAlert;

use super::state::AppState;

/// Create the API router
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Tunables
        .route("/config", get(get_config).post(update_config))
        // Simulation control
        .route("/reset", post(reset))
        .route("/boundary/reload", post(reload_boundary))
        .route("/start", post(start))
        .route("/stop", post(stop))
        // Inspection
        .route("/stats", get(get_stats))
        .route("/health", get(health))
        .route("/herd", get(get_herd))
        .route("/strays", get(get_strays))
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(error: impl ToString) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

// --- Config ---

async fn get_config(State(state): State<Arc<AppState>>) -> Json<HerdConfig> {
    Json(state.simulator.config().await)
}

#[derive(Serialize)]
struct ConfigUpdateResponse {
    config: HerdConfig,
    message: String,
}

async fn update_config(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<HerdConfigPatch>, JsonRejection>,
) -> Result<Json<ConfigUpdateResponse>, ApiError> {
    let Json(patch) = payload.map_err(|e| bad_request(e.body_text()))?;
    match state.simulator.apply_config(&patch).await {
        Ok(config) => Ok(Json(ConfigUpdateResponse {
            config,
            message: "Herd configuration updated".to_string(),
        })),
        Err(e) => {
            log::warn!("Rejected herd configuration update: {}", e);
            Err(bad_request(e))
        }
    }
}

// --- Simulation Control ---

async fn reset(State(state): State<Arc<AppState>>) -> Json<ResetSummary> {
    Json(state.simulator.reset().await)
}

#[derive(Serialize)]
struct BoundaryResponse {
    success: bool,
    center: GeoPoint,
    fenced: bool,
}

/// Re-read the ranch boundary from the backend. Movement uses the new
/// fence at once; anchors move at the next reset.
async fn reload_boundary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BoundaryResponse>, ApiError> {
    let pasture = state.simulator.sink().fetch_pasture().await.map_err(|e| {
        log::warn!("Boundary reload failed: {}", e);
        (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;

    let response = BoundaryResponse {
        success: true,
        center: pasture.center,
        fenced: pasture.fence.is_some(),
    };
    log::info!(
        "Pasture boundary reloaded: centre ({:.6}, {:.6})",
        response.center.lat,
        response.center.lon
    );
    state.simulator.set_pasture(pasture).await;
    Ok(Json(response))
}

#[derive(Serialize)]
struct ControlResponse {
    success: bool,
    message: String,
}

async fn start(State(state): State<Arc<AppState>>) -> Json<ControlResponse> {
    let started = state.simulator.start().await;
    Json(ControlResponse {
        success: started,
        message: if started {
            "Herd simulation started".to_string()
        } else {
            "Herd simulation is already running".to_string()
        },
    })
}

async fn stop(State(state): State<Arc<AppState>>) -> Json<ControlResponse> {
    let stopped = state.simulator.stop().await;
    Json(ControlResponse {
        success: stopped,
        message: if stopped {
            "Herd simulation stopped".to_string()
        } else {
            "Herd simulation is not running".to_string()
        },
    })
}

// --- Inspection ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(flatten)]
    stats: HerdStats,
    is_running: bool,
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        stats: state.simulator.stats().await,
        is_running: state.simulator.is_running().await,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    simulator: &'static str,
    is_running: bool,
    cattle_count: usize,
    stray_count: usize,
    uptime_seconds: u64,
    update_interval_ms: u64,
    ranch_os_url: String,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let stats = state.simulator.stats().await;
    Json(HealthResponse {
        status: "ok",
        simulator: "herd",
        is_running: state.simulator.is_running().await,
        cattle_count: stats.total_cattle,
        stray_count: stats.active_stray_alerts,
        uptime_seconds: state.uptime_seconds(),
        update_interval_ms: state.simulator.interval().as_millis() as u64,
        ranch_os_url: state.backend_url().to_string(),
    })
}

#[derive(Serialize)]
struct HerdResponse {
    herd: Vec<HerdRecord>,
    config: HerdConfig,
    stats: HerdStats,
}

async fn get_herd(State(state): State<Arc<AppState>>) -> Json<HerdResponse> {
    let (herd, config, stats) = state.simulator.snapshot().await;
    Json(HerdResponse { herd, config, stats })
}

#[derive(Serialize)]
struct StraysResponse {
    alerts: Vec<StrayAlert>,
}

async fn get_strays(State(state): State<Arc<AppState>>) -> Json<StraysResponse> {
    Json(StraysResponse {
        alerts: state.simulator.alerts().await,
    })
}
