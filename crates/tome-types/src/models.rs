use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The three content kinds. Each lives in its own table with an identical
/// column layout, so everything kind-specific hangs off this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Campaign,
    Character,
    Oneshot,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [
        ContentKind::Campaign,
        ContentKind::Character,
        ContentKind::Oneshot,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Campaign => "campaign",
            ContentKind::Character => "character",
            ContentKind::Oneshot => "oneshot",
        }
    }

    /// Backing table in the content store.
    pub fn table(self) -> &'static str {
        match self {
            ContentKind::Campaign => "campaigns",
            ContentKind::Character => "vault_characters",
            ContentKind::Oneshot => "oneshots",
        }
    }

    /// Reasons an owner may give when shelving content of this kind.
    pub fn inactive_reasons(self) -> &'static [InactiveReason] {
        use InactiveReason::*;
        match self {
            ContentKind::Campaign => &[Completed, OnHiatus, Retired],
            ContentKind::Character => &[Retired, Deceased, OnHiatus],
            ContentKind::Oneshot => &[Completed, Archived],
        }
    }

    pub fn allows_reason(self, reason: InactiveReason) -> bool {
        self.inactive_reasons().contains(&reason)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "campaign" => Ok(ContentKind::Campaign),
            "character" => Ok(ContentKind::Character),
            "oneshot" => Ok(ContentKind::Oneshot),
            other => Err(ParseError::new("content kind", other)),
        }
    }
}

/// Active/inactive axis. Publication is tracked separately through
/// `published_at`, soft-deletion through `deleted_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    Active,
    Inactive,
}

impl ContentMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentMode::Active => "active",
            ContentMode::Inactive => "inactive",
        }
    }
}

impl fmt::Display for ContentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ContentMode::Active),
            "inactive" => Ok(ContentMode::Inactive),
            other => Err(ParseError::new("content mode", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InactiveReason {
    Completed,
    OnHiatus,
    Retired,
    Deceased,
    Archived,
}

impl InactiveReason {
    pub fn as_str(self) -> &'static str {
        match self {
            InactiveReason::Completed => "completed",
            InactiveReason::OnHiatus => "on_hiatus",
            InactiveReason::Retired => "retired",
            InactiveReason::Deceased => "deceased",
            InactiveReason::Archived => "archived",
        }
    }
}

impl fmt::Display for InactiveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InactiveReason {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(InactiveReason::Completed),
            "on_hiatus" => Ok(InactiveReason::OnHiatus),
            "retired" => Ok(InactiveReason::Retired),
            "deceased" => Ok(InactiveReason::Deceased),
            "archived" => Ok(InactiveReason::Archived),
            other => Err(ParseError::new("inactive reason", other)),
        }
    }
}

/// Unrecognised enum text, either from a request or from a corrupt row.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what}: '{value}'")]
pub struct ParseError {
    pub what: &'static str,
    pub value: String,
}

impl ParseError {
    fn new(what: &'static str, value: &str) -> Self {
        Self {
            what,
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_sets_are_kind_specific() {
        assert!(ContentKind::Campaign.allows_reason(InactiveReason::OnHiatus));
        assert!(!ContentKind::Campaign.allows_reason(InactiveReason::Deceased));
        assert!(ContentKind::Character.allows_reason(InactiveReason::Deceased));
        assert!(!ContentKind::Character.allows_reason(InactiveReason::Completed));
        assert!(ContentKind::Oneshot.allows_reason(InactiveReason::Archived));
        assert!(!ContentKind::Oneshot.allows_reason(InactiveReason::Retired));
    }

    #[test]
    fn kinds_map_to_tables() {
        assert_eq!(ContentKind::Campaign.table(), "campaigns");
        assert_eq!(ContentKind::Character.table(), "vault_characters");
        assert_eq!(ContentKind::Oneshot.table(), "oneshots");
    }

    #[test]
    fn text_forms_match_serde() {
        for kind in ContentKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            assert_eq!(kind.as_str().parse::<ContentKind>().unwrap(), kind);
        }
        let json = serde_json::to_string(&InactiveReason::OnHiatus).unwrap();
        assert_eq!(json, "\"on_hiatus\"");
        assert!("sleeping".parse::<InactiveReason>().is_err());
    }

    #[test]
    fn parse_error_names_the_field_and_value() {
        let err = "spellbook".parse::<ContentKind>().unwrap_err();
        assert_eq!(err.what, "content kind");
        assert_eq!(err.to_string(), "unknown content kind: 'spellbook'");

        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert!(boxed.source().is_none());
    }
}
