//! Request handlers for the JSON API.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::archive;
use crate::error::{ApiError, ApiResult};
use crate::scenario::{self, EXPORT_FILENAME, FormInput, Scenario};
use crate::session::Session;
use crate::state::AppState;
use crate::video::VideoResult;

const ARCHIVE_FILENAME: &str = "reel-videos.zip";

#[derive(Debug, Serialize, Deserialize)]
pub struct ScenariosResponse {
    pub scenarios: Vec<Scenario>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VideosRequest {
    pub scenarios: Vec<Scenario>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VideosResponse {
    pub videos: Vec<VideoResult>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreated {
    pub session_id: Uuid,
    pub scenarios: Vec<Scenario>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRequest {
    pub scenario_ids: Vec<i64>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

async fn scenarios_for(state: &AppState, form: &FormInput) -> ApiResult<Vec<Scenario>> {
    let blank = form.blank_fields();
    if !blank.is_empty() {
        return Err(ApiError::bad_request(format!(
            "Missing required fields: {}",
            blank.join(", ")
        )));
    }

    state.scenarios.generate(form).await.map_err(|err| {
        error!("Error generating scenarios: {:#}", err);
        ApiError::internal("Failed to generate scenarios")
    })
}

async fn videos_for(state: &AppState, scenarios: &[Scenario]) -> ApiResult<Vec<VideoResult>> {
    if let Some(id) = scenario::duplicate_id(scenarios) {
        return Err(ApiError::bad_request(format!(
            "Scenario id {id} appears more than once"
        )));
    }

    state.store().ensure_dir().await.map_err(|err| {
        error!("Error preparing video directory: {}", err);
        ApiError::internal("Failed to generate videos")
    })?;

    Ok(state.videos.run_batch(scenarios).await)
}

/// `POST /generate`
pub async fn generate_scenarios(
    State(state): State<AppState>,
    payload: Result<Json<FormInput>, JsonRejection>,
) -> ApiResult<Json<ScenariosResponse>> {
    let Json(form) = payload?;
    let scenarios = scenarios_for(&state, &form).await?;
    Ok(Json(ScenariosResponse { scenarios }))
}

/// `POST /generate-videos`
pub async fn generate_videos(
    State(state): State<AppState>,
    payload: Result<Json<VideosRequest>, JsonRejection>,
) -> ApiResult<Json<VideosResponse>> {
    let Json(request) = payload?;
    let videos = videos_for(&state, &request.scenarios).await?;
    Ok(Json(VideosResponse { videos }))
}

fn parse_session_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found("Session not found"))
}

async fn load_session(state: &AppState, raw_id: &str) -> ApiResult<Session> {
    let id = parse_session_id(raw_id)?;
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| ApiError::not_found("Session not found"))
}

/// `POST /api/sessions`
pub async fn create_session(
    State(state): State<AppState>,
    payload: Result<Json<FormInput>, JsonRejection>,
) -> ApiResult<Json<SessionCreated>> {
    let Json(form) = payload?;
    let scenarios = scenarios_for(&state, &form).await?;
    let session = state.sessions.create(form, scenarios).await;
    info!(
        "Session {} created with {} scenarios",
        session.session_id,
        session.scenarios.len()
    );
    Ok(Json(SessionCreated {
        session_id: session.session_id,
        scenarios: session.scenarios,
    }))
}

/// `GET /api/sessions/:id`
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Session>> {
    Ok(Json(load_session(&state, &id).await?))
}

/// `PUT /api/sessions/:id/selection`
pub async fn update_selection(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<SelectionRequest>, JsonRejection>,
) -> ApiResult<Json<ScenariosResponse>> {
    let id = parse_session_id(&id)?;
    let Json(request) = payload?;
    let session = state
        .sessions
        .set_selection(id, &request.scenario_ids)
        .await
        .ok_or_else(|| ApiError::not_found("Session not found"))?;
    Ok(Json(ScenariosResponse {
        scenarios: session.scenarios,
    }))
}

/// `GET /api/sessions/:id/export`
pub async fn export_selection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let session = load_session(&state, &id).await?;
    let text = scenario::export_selected(&session.scenarios);
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILENAME}\""),
            ),
        ],
        text,
    ))
}

/// `POST /api/sessions/:id/videos`
///
/// Stores the submitted selection, then renders exactly those scenarios.
pub async fn render_session_videos(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<SelectionRequest>, JsonRejection>,
) -> ApiResult<Json<VideosResponse>> {
    let id = parse_session_id(&id)?;
    let Json(request) = payload?;
    let selected = state
        .sessions
        .set_selection(id, &request.scenario_ids)
        .await
        .ok_or_else(|| ApiError::not_found("Session not found"))?
        .selected();
    if selected.is_empty() {
        return Err(ApiError::bad_request("No scenarios selected"));
    }

    let videos = videos_for(&state, &selected).await?;
    state
        .sessions
        .record_videos(id, videos.clone())
        .await
        .ok_or_else(|| ApiError::not_found("Session expired during video generation"))?;
    Ok(Json(VideosResponse { videos }))
}

/// `GET /api/sessions/:id/archive`
pub async fn download_archive(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let session = load_session(&state, &id).await?;
    let videos = session
        .videos
        .ok_or_else(|| ApiError::not_found("No videos for this session"))?;
    if !videos.iter().any(VideoResult::is_completed) {
        return Err(ApiError::not_found("No completed videos for this session"));
    }

    let bytes = archive::build_archive(state.store(), &videos)
        .await
        .map_err(|err| {
            error!("Error building archive: {:#}", err);
            ApiError::internal("Failed to build archive")
        })?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{ARCHIVE_FILENAME}\""),
            ),
        ],
        bytes,
    ))
}
