use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tome_engine::EngineError;
use tome_types::api::ErrorBody;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Unknown content type '{0}'")]
    UnknownKind(String),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

fn engine_status(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Unauthorized | EngineError::SaveNotAllowed => StatusCode::FORBIDDEN,
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::InvalidReason { .. } | EngineError::UsernameRequired => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        EngineError::NotInTargetState { .. }
        | EngineError::TemplateHasDependents { .. }
        | EngineError::ContentMismatch
        | EngineError::AlreadySaved
        | EngineError::AlreadyStarted { .. } => StatusCode::CONFLICT,
        EngineError::OwnTemplate => StatusCode::BAD_REQUEST,
        EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn engine_details(err: &EngineError) -> Option<serde_json::Value> {
    match err {
        EngineError::TemplateHasDependents {
            save_count,
            versions,
        } => Some(json!({ "saveCount": save_count, "versions": versions })),
        EngineError::AlreadyStarted { instance_id } => Some(json!({ "instanceId": instance_id })),
        EngineError::InvalidReason { kind, .. } => Some(json!({ "allowed": kind.inactive_reasons() })),
        _ => None,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Engine(EngineError::Store(e)) => {
                error!("Store error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "store_error",
                        message: "Internal error".into(),
                        details: None,
                    },
                )
            }
            ApiError::Engine(e) => (
                engine_status(e),
                ErrorBody {
                    error: e.code(),
                    message: e.to_string(),
                    details: engine_details(e),
                },
            ),
            ApiError::UnknownKind(_) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: "unknown_kind",
                    message: self.to_string(),
                    details: None,
                },
            ),
            ApiError::InvalidBody(_) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "invalid_body",
                    message: self.to_string(),
                    details: None,
                },
            ),
            ApiError::Join(e) => {
                error!("spawn_blocking join error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "internal_error",
                        message: "Internal error".into(),
                        details: None,
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
