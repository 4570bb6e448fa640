use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use tome_engine::{Caller, PurgeStatus};
use tome_types::api::{Claims, EmptyRecycleBinResponse, KindCount, RecycleBinItem, RecycleBinResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::{blocking, parse_kind};

pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = Caller::from(&claims);
    let entries = blocking(&state, move |engine| engine.list_deleted(&caller)).await?;

    let items = entries
        .into_iter()
        .map(|e| RecycleBinItem {
            id: e.id,
            kind: e.kind,
            name: e.name,
            deleted_at: e.deleted_at,
            days_remaining: e.days_remaining,
        })
        .collect();

    Ok(Json(RecycleBinResponse { items }))
}

pub async fn restore(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_kind(&kind)?;
    let caller = Caller::from(&claims);
    blocking(&state, move |engine| engine.restore(&caller, kind, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn purge(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_kind(&kind)?;
    let caller = Caller::from(&claims);
    blocking(&state, move |engine| engine.purge(&caller, kind, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 200 when every kind emptied, 207 when some did, 500 when none did.
pub async fn empty(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = Caller::from(&claims);
    let report = blocking(&state, move |engine| Ok(engine.empty_all(&caller))).await?;

    let status = report.status();
    let code = match status {
        PurgeStatus::Complete => StatusCode::OK,
        PurgeStatus::Partial => StatusCode::MULTI_STATUS,
        PurgeStatus::Failed => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let body = EmptyRecycleBinResponse {
        success: status == PurgeStatus::Complete,
        partial: status == PurgeStatus::Partial,
        purged: report
            .purged
            .iter()
            .map(|&(kind, count)| KindCount { kind, count })
            .collect(),
        failed: report.failed.iter().map(|(kind, _)| *kind).collect(),
    };

    Ok((code, Json(body)))
}
