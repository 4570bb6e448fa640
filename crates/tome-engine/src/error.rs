use serde::Serialize;
use thiserror::Error;
use tome_types::{ContentKind, ContentMode};
use uuid::Uuid;

/// Saves still held against one published version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionSaves {
    pub version: u32,
    pub saves: i64,
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Not permitted to change content owned by another user")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("'{reason}' is not a valid inactive reason for a {kind}")]
    InvalidReason { kind: ContentKind, reason: String },

    #[error("Content is {actual}, expected {expected}")]
    NotInTargetState {
        expected: ContentMode,
        actual: ContentMode,
    },

    #[error("A username is required before a template can be public")]
    UsernameRequired,

    #[error("Cannot unpublish: this template has been saved {save_count} time(s)")]
    TemplateHasDependents {
        save_count: i64,
        versions: Vec<VersionSaves>,
    },

    #[error("Snapshot belongs to different content than the existing save")]
    ContentMismatch,

    #[error("This template does not allow saving")]
    SaveNotAllowed,

    #[error("Cannot save your own template")]
    OwnTemplate,

    #[error("Already saved to collection")]
    AlreadySaved,

    #[error("Already started playing this template")]
    AlreadyStarted { instance_id: Uuid },

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl EngineError {
    /// Stable machine-readable code for callers.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Unauthorized => "unauthorized",
            EngineError::NotFound(_) => "not_found",
            EngineError::InvalidReason { .. } => "invalid_reason",
            EngineError::NotInTargetState { .. } => "not_in_target_state",
            EngineError::UsernameRequired => "username_required",
            EngineError::TemplateHasDependents { .. } => "template_has_dependents",
            EngineError::ContentMismatch => "content_mismatch",
            EngineError::SaveNotAllowed => "save_not_allowed",
            EngineError::OwnTemplate => "own_template",
            EngineError::AlreadySaved => "already_saved",
            EngineError::AlreadyStarted { .. } => "already_started",
            EngineError::Store(_) => "store_error",
        }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
