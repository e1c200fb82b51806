//! Domain model for people, businesses, meetings and planning records.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Provide input drafts with field-level validation for write paths.
//!
//! # Invariants
//! - Every persisted record is identified by a stable `RecordId`.
//! - Every top-level record is owned by exactly one `UserId`.
//! - Calendar dates are ISO `YYYY-MM-DD` strings.

pub mod business;
pub mod meeting;
pub mod person;
pub mod planning;
pub mod strategy;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for every persisted record.
pub type RecordId = Uuid;

/// Stable identifier of the authenticated owner.
pub type UserId = Uuid;

/// Maximum values kept per tag array.
pub const MAX_TAGS_PER_KIND: usize = 10;

/// Field-level validation failure for a write payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Wire name of the offending field.
    pub field: &'static str,
    /// Short human-readable reason.
    pub reason: &'static str,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: &'static str) -> Self {
        Self { field, reason }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "`{}` {}", self.field, self.reason)
    }
}

impl Error for ValidationError {}

/// AI-derived metadata attached to free-text records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub industries: Vec<String>,
}

impl Tags {
    /// Returns whether no metadata is attached.
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.entities.is_empty() && self.industries.is_empty()
    }

    /// Trims, drops blanks, dedupes case-insensitively and caps every array.
    pub fn normalized(self) -> Self {
        Self {
            keywords: normalize_tag_values(self.keywords),
            entities: normalize_tag_values(self.entities),
            industries: normalize_tag_values(self.industries),
        }
    }
}

fn normalize_tag_values(values: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut result = Vec::new();
    for value in values {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_lowercase()) {
            result.push(trimmed.to_string());
        }
        if result.len() == MAX_TAGS_PER_KIND {
            break;
        }
    }
    result
}

/// Free-text payload shared by memories and note records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContentDraft {
    pub content: String,
}

impl ContentDraft {
    pub fn cleaned(self) -> Result<Self, ValidationError> {
        require_text("content", &self.content)?;
        Ok(Self {
            content: self.content.trim().to_string(),
        })
    }
}

/// Rejects empty or whitespace-only required text.
pub fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "is required"));
    }
    Ok(())
}

/// Validates an optional ISO date.
pub fn validate_optional_date(
    field: &'static str,
    value: Option<&str>,
) -> Result<(), ValidationError> {
    match value {
        Some(text) => parse_date(text)
            .map(|_| ())
            .ok_or_else(|| ValidationError::new(field, "must be a YYYY-MM-DD date")),
        None => Ok(()),
    }
}

/// Parses an ISO `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Trims optional text and maps blank values to `None`.
pub fn clean_optional(value: Option<String>) -> Option<String> {
    value.and_then(|text| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
