//! People and their attached memories, follow-ups and events.
//!
//! # Invariants
//! - `Person::name` is never blank.
//! - Memories, follow-ups and events belong to the same owner as the person
//!   they reference.

use super::{
    clean_optional, parse_date, require_text, validate_optional_date, RecordId, Tags, UserId,
    ValidationError,
};
use serde::{Deserialize, Serialize};

/// Contact record owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: RecordId,
    pub user_id: UserId,
    pub name: String,
    pub relationship: Option<String>,
    pub company: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub linkedin_url: Option<String>,
    #[serde(flatten)]
    pub tags: Tags,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create/update payload for a person.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PersonDraft {
    pub name: String,
    pub relationship: Option<String>,
    pub company: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub linkedin_url: Option<String>,
}

impl PersonDraft {
    /// Creates a draft with only the required name set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Validates and returns a trimmed copy.
    pub fn cleaned(self) -> Result<Self, ValidationError> {
        require_text("name", &self.name)?;
        let email = clean_optional(self.email);
        if let Some(value) = email.as_deref() {
            if !value.contains('@') {
                return Err(ValidationError::new("email", "must be an email address"));
            }
        }
        Ok(Self {
            name: self.name.trim().to_string(),
            relationship: clean_optional(self.relationship),
            company: clean_optional(self.company),
            role: clean_optional(self.role),
            email,
            phone: clean_optional(self.phone),
            notes: clean_optional(self.notes),
            linkedin_url: clean_optional(self.linkedin_url),
        })
    }
}

/// Free-text recollection about a person (or unattached).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    pub id: RecordId,
    pub user_id: UserId,
    pub person_id: Option<RecordId>,
    pub content: String,
    #[serde(flatten)]
    pub tags: Tags,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Pending action, optionally tied to a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUp {
    pub id: RecordId,
    pub user_id: UserId,
    pub person_id: Option<RecordId>,
    pub description: String,
    pub due_date: Option<String>,
    pub completed: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create payload for a follow-up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FollowUpDraft {
    pub person_id: Option<RecordId>,
    pub description: String,
    pub due_date: Option<String>,
}

impl FollowUpDraft {
    pub fn cleaned(self) -> Result<Self, ValidationError> {
        require_text("description", &self.description)?;
        let due_date = clean_optional(self.due_date);
        validate_optional_date("due_date", due_date.as_deref())?;
        Ok(Self {
            person_id: self.person_id,
            description: self.description.trim().to_string(),
            due_date,
        })
    }
}

/// Partial update for a follow-up. An empty `due_date` string clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FollowUpPatch {
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub completed: Option<bool>,
}

impl FollowUpPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(description) = self.description.as_deref() {
            require_text("description", description)?;
        }
        match self.due_date.as_deref().map(str::trim) {
            Some("") | None => Ok(()),
            Some(value) => validate_optional_date("due_date", Some(value)),
        }
    }
}

/// Dated occasion such as a birthday or anniversary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: RecordId,
    pub user_id: UserId,
    pub person_id: Option<RecordId>,
    pub title: String,
    pub event_date: String,
    pub description: Option<String>,
    pub recurring_yearly: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create/update payload for an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventDraft {
    pub person_id: Option<RecordId>,
    pub title: String,
    pub event_date: String,
    pub description: Option<String>,
    pub recurring_yearly: bool,
}

impl EventDraft {
    pub fn cleaned(self) -> Result<Self, ValidationError> {
        require_text("title", &self.title)?;
        require_text("event_date", &self.event_date)?;
        if parse_date(&self.event_date).is_none() {
            return Err(ValidationError::new(
                "event_date",
                "must be a YYYY-MM-DD date",
            ));
        }
        Ok(Self {
            person_id: self.person_id,
            title: self.title.trim().to_string(),
            event_date: self.event_date.trim().to_string(),
            description: clean_optional(self.description),
            recurring_yearly: self.recurring_yearly,
        })
    }
}

/// Event projected onto its next occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpcomingEvent {
    #[serde(flatten)]
    pub event: Event,
    pub next_occurrence: String,
    pub days_until: i64,
}

/// Person with every attached record, used by detail reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonDetail {
    #[serde(flatten)]
    pub person: Person,
    pub memories: Vec<Memory>,
    pub follow_ups: Vec<FollowUp>,
    pub events: Vec<Event>,
}

/// Memory text with optional AI metadata, used by batch capture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryDraft {
    pub content: String,
    pub tags: Tags,
}

/// Structured records extracted from one free-form note.
///
/// When `person` is set, the person is matched by case-insensitive name
/// within the owner's contacts and created when missing; every other record
/// is attached to that person.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureDraft {
    pub person: Option<PersonDraft>,
    pub memories: Vec<MemoryDraft>,
    pub follow_ups: Vec<FollowUpDraft>,
    pub events: Vec<EventDraft>,
}

/// Records written by one capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureResult {
    pub person: Option<Person>,
    pub person_created: bool,
    pub memories: Vec<Memory>,
    pub follow_ups: Vec<FollowUp>,
    pub events: Vec<Event>,
}

#[cfg(test)]
mod tests {
    use super::{EventDraft, FollowUpPatch, PersonDraft};

    #[test]
    fn person_draft_requires_name_and_valid_email() {
        let err = PersonDraft::default().cleaned().unwrap_err();
        assert_eq!(err.field, "name");

        let mut draft = PersonDraft::named("Ada");
        draft.email = Some("not-an-email".to_string());
        assert_eq!(draft.cleaned().unwrap_err().field, "email");
    }

    #[test]
    fn event_draft_requires_parseable_date() {
        let draft = EventDraft {
            title: "Birthday".to_string(),
            event_date: "March 3".to_string(),
            ..EventDraft::default()
        };
        assert_eq!(draft.cleaned().unwrap_err().field, "event_date");
    }

    #[test]
    fn follow_up_patch_accepts_empty_due_date_as_clear() {
        let patch = FollowUpPatch {
            due_date: Some(String::new()),
            ..FollowUpPatch::default()
        };
        assert!(patch.validate().is_ok());
    }
}
