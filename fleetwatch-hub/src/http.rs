/**
 * API REST FLEETWATCH - Routes HTTP du hub
 *
 * ROUTES :
 * - GET /health                        : liveness
 * - GET /system/health                 : état du hub (canaux, sessions, planificateur)
 * - GET /api/mes-agent-report?plant=X  : même vue que le topic `data:X`
 * - GET /api/force-all                 : `force-report` vers tous les canaux
 * - GET /ws                            : upgrade WebSocket des agents et dashboards
 */

use crate::health::HubHealth;
use crate::hub::Hub;
use crate::ws::ws_handler;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct PlantParams {
    pub plant: Option<String>,
}

pub fn build_router(hub: Hub) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/api/mes-agent-report", get(get_plant_report))
        .route("/api/force-all", get(force_all))
        .route("/ws", get(ws_handler))
        .with_state(hub)
}

// GET /api/mes-agent-report?plant=Plant%20A
pub async fn get_plant_report(State(hub): State<Hub>, Query(params): Query<PlantParams>) -> Response {
    let Some(plant) = params.plant.filter(|p| !p.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "missing plant parameter" })),
        )
            .into_response();
    };

    match hub.reader().read(&plant).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => {
            log::error!("[http] plant query {} failed: {}", plant, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "query failed" })),
            )
                .into_response()
        }
    }
}

// GET /api/force-all
pub async fn force_all(State(hub): State<Hub>) -> String {
    let reached = hub.force_all();
    format!("force-report sent to {reached} channel(s)")
}

// GET /system/health
pub async fn get_system_health(State(hub): State<Hub>) -> Json<HubHealth> {
    Json(hub.health().await)
}
