//! Mission and diagnostic CRUD (§4.10), modeled on
//! `original_source/controller/misson.go` and `controller/diagnose.go`.
//! Every success response is wrapped the way the original's
//! `WrapResp`/`WrapRespWithData` helpers do.

use super::error::ApiError;
use super::AppState;
use crate::store::Diagnostic;
use crate::types::{EventStatus, Mission};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Success envelope mirroring the original's `ApiResp<T>`.
#[derive(Debug, Serialize)]
pub struct ApiResp<T> {
    pub message: String,
    pub data: T,
}

impl<T> ApiResp<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            message: "ok".to_string(),
            data,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMissionRequest {
    pub name: String,
    pub duration: i64,
    pub created_by: String,
    #[serde(default)]
    pub success_rate: Option<f64>,
}

pub async fn create_mission(
    State(state): State<AppState>,
    Json(body): Json<CreateMissionRequest>,
) -> Result<Json<ApiResp<Mission>>, ApiError> {
    let mission = state
        .store
        .add_mission(&body.name, &body.created_by, body.duration, body.success_rate)
        .await?;
    Ok(ApiResp::ok(mission))
}

pub async fn list_missions(State(state): State<AppState>) -> Result<Json<ApiResp<Vec<Mission>>>, ApiError> {
    let missions = state.store.list_missions().await?;
    Ok(ApiResp::ok(missions))
}

pub async fn get_mission(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<ApiResp<Mission>>, ApiError> {
    let mission = state.store.get_mission(id).await?;
    Ok(ApiResp::ok(mission))
}

#[derive(Debug, Deserialize)]
pub struct UpdateMissionStatusRequest {
    pub status: EventStatus,
}

pub async fn update_mission_status(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(body): Json<UpdateMissionStatusRequest>,
) -> Result<Json<ApiResp<()>>, ApiError> {
    state.store.update_mission_status(id, body.status).await?;
    Ok(ApiResp::ok(()))
}

#[derive(Debug, Deserialize)]
pub struct CreateDiagnosticRequest {
    pub mission_id: u64,
    pub description: String,
    pub hull_level: f64,
    pub fuel_level: f64,
    pub oxygen_level: f64,
    pub temperature_level: f64,
    pub pressure_level: f64,
}

pub async fn create_diagnostic(
    State(state): State<AppState>,
    Json(body): Json<CreateDiagnosticRequest>,
) -> Result<Json<ApiResp<Diagnostic>>, ApiError> {
    let diagnostic = Diagnostic {
        id: 0,
        mission_id: body.mission_id,
        description: body.description,
        hull_level: body.hull_level,
        fuel_level: body.fuel_level,
        oxygen_level: body.oxygen_level,
        temperature_level: body.temperature_level,
        pressure_level: body.pressure_level,
        created_at: chrono::Utc::now(),
    };
    let diagnostic = state.store.add_diagnostic(diagnostic).await?;
    Ok(ApiResp::ok(diagnostic))
}

#[derive(Debug, Deserialize)]
pub struct ListDiagnosticsQuery {
    pub mission_id: u64,
}

pub async fn list_diagnostics(
    State(state): State<AppState>,
    Query(query): Query<ListDiagnosticsQuery>,
) -> Result<Json<ApiResp<Vec<Diagnostic>>>, ApiError> {
    let diagnostics = state.store.list_diagnostics(query.mission_id).await?;
    Ok(ApiResp::ok(diagnostics))
}

pub async fn get_diagnostic(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<ApiResp<Diagnostic>>, ApiError> {
    let diagnostic = state.store.get_diagnostic(id).await?;
    Ok(ApiResp::ok(diagnostic))
}
