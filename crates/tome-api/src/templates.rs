use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use tome_db::models::SnapshotRow;
use tome_engine::{Caller, PublishOptions};
use tome_types::api::{
    Claims, PublishRequest, PublishResponse, SnapshotResponse, TemplateStatsResponse,
    ToggleVisibilityRequest, UnpublishResponse, VersionEntry, VersionsResponse,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::{blocking, parse_kind};

fn version_entry(s: SnapshotRow) -> VersionEntry {
    VersionEntry {
        snapshot_id: s.id,
        version: s.version,
        version_name: s.version_name,
        save_count: s.save_count,
        published_at: s.published_at,
        allow_save: s.allow_save,
        is_public: s.is_public,
    }
}

pub async fn publish(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PublishRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_kind(&kind)?;
    let caller = Caller::from(&claims);
    let options = PublishOptions {
        is_public: req.is_public,
        version_name: req.version_name,
        version_notes: req.version_notes,
    };

    let out = blocking(&state, move |engine| engine.publish(&caller, kind, id, &options)).await?;

    Ok((
        StatusCode::CREATED,
        Json(PublishResponse {
            snapshot_id: out.snapshot_id,
            version: out.version,
            published_at: out.published_at,
        }),
    ))
}

pub async fn unpublish(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_kind(&kind)?;
    let caller = Caller::from(&claims);
    let out = blocking(&state, move |engine| engine.unpublish(&caller, kind, id)).await?;
    Ok(Json(UnpublishResponse {
        removed_snapshots: out.removed_snapshots,
    }))
}

pub async fn list_versions(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_kind(&kind)?;
    let caller = Caller::from(&claims);
    let listing = blocking(&state, move |engine| engine.list_versions(&caller, kind, id)).await?;

    Ok(Json(VersionsResponse {
        is_owner: listing.is_owner,
        versions: listing.versions.into_iter().map(version_entry).collect(),
    }))
}

pub async fn stats(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_kind(&kind)?;
    let caller = Caller::from(&claims);
    let stats = blocking(&state, move |engine| engine.template_stats(&caller, kind, id)).await?;

    Ok(Json(TemplateStatsResponse {
        total_saves: stats.total_saves,
        total_started: stats.total_started,
        versions: stats.versions.into_iter().map(version_entry).collect(),
    }))
}

pub async fn toggle_visibility(
    State(state): State<AppState>,
    Path(snapshot_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ToggleVisibilityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = Caller::from(&claims);
    let s = blocking(&state, move |engine| {
        engine.toggle_visibility(&caller, snapshot_id, req.is_public)
    })
    .await?;

    Ok(Json(SnapshotResponse {
        id: s.id,
        content_type: s.content_type,
        content_id: s.content_id,
        version: s.version,
        version_name: s.version_name,
        is_public: s.is_public,
        allow_save: s.allow_save,
        attribution_name: s.attribution_name,
        save_count: s.save_count,
        published_at: s.published_at,
    }))
}
