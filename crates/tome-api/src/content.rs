use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use tome_db::models::ContentRow;
use tome_engine::Caller;
use tome_types::api::{Claims, ContentResponse, CreateContentRequest, SetInactiveRequest};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::{blocking, parse_kind};

pub(crate) fn content_response(row: ContentRow) -> ContentResponse {
    ContentResponse {
        id: row.id,
        kind: row.kind,
        name: row.name,
        data: row.data,
        content_mode: row.content_mode,
        inactive_reason: row.inactive_reason,
        template_version: row.template_version,
        published_at: row.published_at,
        is_session0_ready: row.is_session0_ready,
        allow_save: row.allow_save,
        created_at: row.created_at,
    }
}

pub async fn create_content(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_kind(&kind)?;
    let caller = Caller::from(&claims);
    let data = if req.data.is_null() {
        serde_json::json!({})
    } else {
        req.data
    };

    let row = blocking(&state, move |engine| {
        engine.create_content(&caller, kind, &req.name, &data)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(content_response(row))))
}

pub async fn get_content(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_kind(&kind)?;
    let caller = Caller::from(&claims);
    let row = blocking(&state, move |engine| engine.get_content(&caller, kind, id)).await?;
    Ok(Json(content_response(row)))
}

/// Soft delete: the item moves to the recycle bin.
pub async fn delete_content(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_kind(&kind)?;
    let caller = Caller::from(&claims);
    blocking(&state, move |engine| engine.soft_delete(&caller, kind, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_inactive(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SetInactiveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_kind(&kind)?;
    let caller = Caller::from(&claims);
    let row = blocking(&state, move |engine| {
        engine.set_inactive_str(&caller, kind, id, &req.reason)
    })
    .await?;
    Ok(Json(content_response(row)))
}

pub async fn reactivate(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_kind(&kind)?;
    let caller = Caller::from(&claims);
    let row = blocking(&state, move |engine| engine.reactivate(&caller, kind, id)).await?;
    Ok(Json(content_response(row)))
}
