pub mod auth;
pub mod content;
pub mod error;
pub mod middleware;
pub mod recycle_bin;
pub mod saves;
pub mod templates;

use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
};
use tome_engine::Engine;
use tome_types::ContentKind;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::require_auth;

/// Every route the service exposes. Everything except `/health` sits behind
/// the JWT middleware.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/content/{kind}", post(content::create_content))
        .route(
            "/content/{kind}/{id}",
            get(content::get_content).delete(content::delete_content),
        )
        .route("/content/{kind}/{id}/inactive", post(content::set_inactive))
        .route("/content/{kind}/{id}/reactivate", post(content::reactivate))
        .route("/recycle-bin", get(recycle_bin::list))
        .route("/recycle-bin/empty", post(recycle_bin::empty))
        .route("/recycle-bin/{kind}/{id}", delete(recycle_bin::purge))
        .route("/recycle-bin/{kind}/{id}/restore", post(recycle_bin::restore))
        .route("/templates/{kind}/{id}/publish", post(templates::publish))
        .route("/templates/{kind}/{id}/unpublish", post(templates::unpublish))
        .route("/templates/{kind}/{id}/versions", get(templates::list_versions))
        .route("/templates/{kind}/{id}/stats", get(templates::stats))
        .route("/snapshots/{id}/visibility", patch(templates::toggle_visibility))
        .route("/saves", post(saves::create_save).get(saves::list_saves))
        .route(
            "/saves/{id}",
            put(saves::update_saved).delete(saves::remove_save),
        )
        .route("/saves/{id}/start-playing", post(saves::start_playing))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Run an engine call on the blocking pool; the store is synchronous.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Engine) -> tome_engine::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let engine = state.engine.clone();
    let value = tokio::task::spawn_blocking(move || f(&engine)).await??;
    Ok(value)
}

pub(crate) fn parse_kind(raw: &str) -> Result<ContentKind, ApiError> {
    raw.parse().map_err(|_| ApiError::UnknownKind(raw.to_string()))
}
