//! Database row types. Kept apart from the tome-types DTOs so the store does
//! not depend on the HTTP shape.
use chrono::{DateTime, Utc};
use tome_types::{ContentKind, ContentMode, InactiveReason};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ContentRow {
    pub id: Uuid,
    pub kind: ContentKind,
    pub user_id: Uuid,
    pub name: String,
    pub data: serde_json::Value,
    pub content_mode: ContentMode,
    pub inactive_reason: Option<InactiveReason>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub template_version: u32,
    pub published_at: Option<DateTime<Utc>>,
    pub is_session0_ready: bool,
    pub allow_save: bool,
    /// Set when this row was started from someone else's template.
    pub template_source_id: Option<Uuid>,
    pub saved_template_version: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl ContentRow {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }
}

pub struct NewContent<'a> {
    pub id: Uuid,
    pub kind: ContentKind,
    pub user_id: Uuid,
    pub name: &'a str,
    pub data: &'a serde_json::Value,
    pub template_source_id: Option<Uuid>,
    pub saved_template_version: Option<u32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SnapshotRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content_type: ContentKind,
    pub content_id: Uuid,
    pub version: u32,
    pub version_name: Option<String>,
    pub version_notes: Option<String>,
    pub snapshot_data: serde_json::Value,
    pub is_public: bool,
    pub allow_save: bool,
    pub attribution_name: Option<String>,
    pub save_count: i64,
    pub published_at: DateTime<Utc>,
}

impl SnapshotRow {
    /// Display name captured at publish time.
    pub fn source_name(&self) -> &str {
        self.snapshot_data
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("Untitled")
    }
}

pub struct NewSnapshot<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content_type: ContentKind,
    pub content_id: Uuid,
    pub version: u32,
    pub version_name: Option<&'a str>,
    pub version_notes: Option<&'a str>,
    pub snapshot_data: &'a serde_json::Value,
    pub is_public: bool,
    pub attribution_name: Option<&'a str>,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SaveRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub snapshot_id: Uuid,
    pub source_type: ContentKind,
    pub source_name: String,
    pub source_owner_id: Uuid,
    pub saved_version: u32,
    pub latest_available_version: u32,
    pub update_available: bool,
    pub instance_id: Option<Uuid>,
    pub saved_at: DateTime<Utc>,
    pub started_playing_at: Option<DateTime<Utc>>,
}

pub struct NewSave<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub snapshot_id: Uuid,
    pub source_type: ContentKind,
    pub source_name: &'a str,
    pub source_owner_id: Uuid,
    pub version: u32,
    pub saved_at: DateTime<Utc>,
}
