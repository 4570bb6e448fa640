use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ContentKind, ContentMode, InactiveReason};

// -- JWT Claims --

/// Identity handed to us by the auth provider. `username` is absent until the
/// user picks one, which matters for public templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub username: Option<String>,
    pub exp: usize,
}

// -- Content --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateContentRequest {
    pub name: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetInactiveRequest {
    pub reason: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentResponse {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub name: String,
    pub data: serde_json::Value,
    pub content_mode: ContentMode,
    pub inactive_reason: Option<InactiveReason>,
    pub template_version: u32,
    pub published_at: Option<DateTime<Utc>>,
    pub is_session0_ready: bool,
    pub allow_save: bool,
    pub created_at: DateTime<Utc>,
}

// -- Recycle bin --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecycleBinItem {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub name: String,
    pub deleted_at: DateTime<Utc>,
    pub days_remaining: i64,
}

#[derive(Debug, Serialize)]
pub struct RecycleBinResponse {
    pub items: Vec<RecycleBinItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyRecycleBinResponse {
    pub success: bool,
    pub partial: bool,
    pub purged: Vec<KindCount>,
    pub failed: Vec<ContentKind>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KindCount {
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub count: usize,
}

// -- Templates --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PublishRequest {
    pub is_public: bool,
    #[serde(default)]
    pub version_name: Option<String>,
    #[serde(default)]
    pub version_notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub snapshot_id: Uuid,
    pub version: u32,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnpublishResponse {
    pub removed_snapshots: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ToggleVisibilityRequest {
    pub is_public: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    pub id: Uuid,
    pub content_type: ContentKind,
    pub content_id: Uuid,
    pub version: u32,
    pub version_name: Option<String>,
    pub is_public: bool,
    pub allow_save: bool,
    pub attribution_name: Option<String>,
    pub save_count: i64,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub snapshot_id: Uuid,
    pub version: u32,
    pub version_name: Option<String>,
    pub save_count: i64,
    pub published_at: DateTime<Utc>,
    pub allow_save: bool,
    pub is_public: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionsResponse {
    pub is_owner: bool,
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateStatsResponse {
    pub total_saves: i64,
    pub total_started: usize,
    pub versions: Vec<VersionEntry>,
}

// -- Saves --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateSaveRequest {
    pub snapshot_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateSavedRequest {
    pub snapshot_id: Uuid,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StartPlayingRequest {
    #[serde(default)]
    pub custom_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub id: Uuid,
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

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaveResponse {
    pub save_id: Uuid,
    pub saved_version: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSavedResponse {
    pub new_version: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPlayingResponse {
    pub instance_id: Uuid,
    #[serde(rename = "type")]
    pub kind: ContentKind,
}

// -- Errors --

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
