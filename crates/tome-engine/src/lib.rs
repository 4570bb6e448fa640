//! Content lifecycle and template distribution.
//!
//! The engine owns every rule that spans more than one row: the
//! active/inactive state machine, the recycle bin retention contract,
//! snapshot versioning, and save references to other users' snapshots.
//! All multi-step mutations run in a single store transaction.

pub mod error;
pub mod lifecycle;
pub mod recycle_bin;
pub mod saves;
pub mod templates;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tome_db::Database;
use tome_types::api::Claims;
use uuid::Uuid;

pub use error::{EngineError, Result, VersionSaves};
pub use recycle_bin::{PurgeReport, PurgeStatus, RETENTION_DAYS, RecycleBinEntry, days_remaining};
pub use saves::UpdateOutcome;
pub use templates::{PublishOptions, PublishOutcome, TemplateStats, UnpublishOutcome, VersionListing};

/// Source of "now". Swappable so retention math can be tested.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The authenticated user making a request.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: Uuid,
    pub username: Option<String>,
}

impl Caller {
    pub fn new(user_id: Uuid, username: Option<String>) -> Self {
        Self { user_id, username }
    }

    /// A username usable for public attribution: present and not blank.
    pub fn stable_username(&self) -> Option<&str> {
        self.username
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

impl From<&Claims> for Caller {
    fn from(claims: &Claims) -> Self {
        Self::new(claims.sub, claims.username.clone())
    }
}

#[derive(Clone)]
pub struct Engine {
    db: Arc<Database>,
    clock: Clock,
}

impl Engine {
    pub fn new(db: Arc<Database>) -> Self {
        Self::with_clock(db, Arc::new(Utc::now))
    }

    pub fn with_clock(db: Arc<Database>, clock: Clock) -> Self {
        Self { db, clock }
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}
