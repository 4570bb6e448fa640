use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use tome_db::models::SaveRow;
use tome_engine::Caller;
use tome_types::api::{
    Claims, CreateSaveRequest, CreateSaveResponse, SaveResponse, StartPlayingRequest,
    StartPlayingResponse, UpdateSavedRequest, UpdateSavedResponse,
};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;

fn save_response(s: SaveRow) -> SaveResponse {
    SaveResponse {
        id: s.id,
        snapshot_id: s.snapshot_id,
        source_type: s.source_type,
        source_name: s.source_name,
        source_owner_id: s.source_owner_id,
        saved_version: s.saved_version,
        latest_available_version: s.latest_available_version,
        update_available: s.update_available,
        instance_id: s.instance_id,
        saved_at: s.saved_at,
        started_playing_at: s.started_playing_at,
    }
}

pub async fn create_save(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateSaveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = Caller::from(&claims);
    let save = blocking(&state, move |engine| engine.create_save(&caller, req.snapshot_id)).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateSaveResponse {
            save_id: save.id,
            saved_version: save.saved_version,
        }),
    ))
}

pub async fn list_saves(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = Caller::from(&claims);
    let saves = blocking(&state, move |engine| engine.list_saves(&caller)).await?;
    let body: Vec<SaveResponse> = saves.into_iter().map(save_response).collect();
    Ok(Json(body))
}

pub async fn update_saved(
    State(state): State<AppState>,
    Path(save_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateSavedRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = Caller::from(&claims);
    let out = blocking(&state, move |engine| {
        engine.update_saved(&caller, save_id, req.snapshot_id)
    })
    .await?;
    Ok(Json(UpdateSavedResponse {
        new_version: out.new_version,
    }))
}

pub async fn remove_save(
    State(state): State<AppState>,
    Path(save_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = Caller::from(&claims);
    blocking(&state, move |engine| engine.remove_save(&caller, save_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The body is optional; without one the copy takes the template's name.
pub async fn start_playing(
    State(state): State<AppState>,
    Path(save_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let caller = Caller::from(&claims);
    let req: StartPlayingRequest = if body.is_empty() {
        StartPlayingRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidBody(e.to_string()))?
    };

    let row = blocking(&state, move |engine| {
        engine.start_playing(&caller, save_id, req.custom_name.as_deref())
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(StartPlayingResponse {
            instance_id: row.id,
            kind: row.kind,
        }),
    ))
}
