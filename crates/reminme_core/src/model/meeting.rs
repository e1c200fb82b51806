//! Meetings and their child records.
//!
//! # Invariants
//! - Child rows (attendees, agenda, notes, questions, follow-ups) are owned
//!   through their meeting; they carry no `user_id` of their own.
//! - Context cards are owned directly and may outlive a deleted meeting.

use super::{
    clean_optional, require_text, validate_optional_date, RecordId, Tags, UserId, ValidationError,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
}

impl MeetingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(Self::Scheduled),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: RecordId,
    pub user_id: UserId,
    pub business_id: Option<RecordId>,
    pub title: String,
    pub scheduled_at: Option<String>,
    pub location: Option<String>,
    pub purpose: Option<String>,
    pub status: MeetingStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create/update payload for a meeting. Inline attendees and agenda are only
/// honored on create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MeetingDraft {
    pub title: String,
    pub business_id: Option<RecordId>,
    pub scheduled_at: Option<String>,
    pub location: Option<String>,
    pub purpose: Option<String>,
    pub status: MeetingStatus,
    pub attendees: Vec<AttendeeDraft>,
    pub agenda: Vec<String>,
}

impl MeetingDraft {
    pub fn cleaned(self) -> Result<Self, ValidationError> {
        require_text("title", &self.title)?;
        let scheduled_at = clean_optional(self.scheduled_at);
        if let Some(value) = scheduled_at.as_deref() {
            if !is_meeting_time(value) {
                return Err(ValidationError::new(
                    "scheduled_at",
                    "must be an ISO date or date-time",
                ));
            }
        }
        let attendees = self
            .attendees
            .into_iter()
            .map(AttendeeDraft::cleaned)
            .collect::<Result<Vec<_>, _>>()?;
        let agenda = self
            .agenda
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();
        Ok(Self {
            title: self.title.trim().to_string(),
            business_id: self.business_id,
            scheduled_at,
            location: clean_optional(self.location),
            purpose: clean_optional(self.purpose),
            status: self.status,
            attendees,
            agenda,
        })
    }
}

fn is_meeting_time(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
        || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub id: RecordId,
    pub meeting_id: RecordId,
    pub person_id: Option<RecordId>,
    pub name: String,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AttendeeDraft {
    pub person_id: Option<RecordId>,
    pub name: String,
    pub role: Option<String>,
}

impl AttendeeDraft {
    pub fn cleaned(self) -> Result<Self, ValidationError> {
        require_text("name", &self.name)?;
        Ok(Self {
            person_id: self.person_id,
            name: self.name.trim().to_string(),
            role: clean_optional(self.role),
        })
    }
}

/// Partial update for an attendee. Unset fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AttendeePatch {
    pub person_id: Option<RecordId>,
    pub name: Option<String>,
    pub role: Option<String>,
}

impl AttendeePatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = self.name.as_deref() {
            require_text("name", name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaItem {
    pub id: RecordId,
    pub meeting_id: RecordId,
    pub item: String,
    pub position: i64,
    pub completed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AgendaItemPatch {
    pub item: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingNote {
    pub id: RecordId,
    pub meeting_id: RecordId,
    pub content: String,
    #[serde(flatten)]
    pub tags: Tags,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingQuestion {
    pub id: RecordId,
    pub meeting_id: RecordId,
    pub question: String,
    pub category: Option<String>,
    pub answer: Option<String>,
    pub answered: bool,
    pub position: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QuestionDraft {
    pub question: String,
    pub category: Option<String>,
}

impl QuestionDraft {
    pub fn cleaned(self) -> Result<Self, ValidationError> {
        require_text("question", &self.question)?;
        Ok(Self {
            question: self.question.trim().to_string(),
            category: clean_optional(self.category),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QuestionPatch {
    pub answer: Option<String>,
    pub answered: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingFollowUp {
    pub id: RecordId,
    pub meeting_id: RecordId,
    pub description: String,
    pub owner: Option<String>,
    pub due_date: Option<String>,
    pub completed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MeetingFollowUpDraft {
    pub description: String,
    pub owner: Option<String>,
    pub due_date: Option<String>,
}

impl MeetingFollowUpDraft {
    pub fn cleaned(self) -> Result<Self, ValidationError> {
        require_text("description", &self.description)?;
        let due_date = clean_optional(self.due_date);
        validate_optional_date("due_date", due_date.as_deref())?;
        Ok(Self {
            description: self.description.trim().to_string(),
            owner: clean_optional(self.owner),
            due_date,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MeetingFollowUpPatch {
    pub description: Option<String>,
    pub owner: Option<String>,
    pub completed: Option<bool>,
}

/// Prep card shown before or during a meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextCard {
    pub id: RecordId,
    pub user_id: UserId,
    pub meeting_id: Option<RecordId>,
    pub person_id: Option<RecordId>,
    pub title: String,
    pub content: Option<String>,
    pub card_type: Option<String>,
    pub position: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContextCardDraft {
    pub meeting_id: Option<RecordId>,
    pub person_id: Option<RecordId>,
    pub title: String,
    pub content: Option<String>,
    pub card_type: Option<String>,
    pub position: Option<i64>,
}

impl ContextCardDraft {
    pub fn cleaned(self) -> Result<Self, ValidationError> {
        require_text("title", &self.title)?;
        Ok(Self {
            meeting_id: self.meeting_id,
            person_id: self.person_id,
            title: self.title.trim().to_string(),
            content: clean_optional(self.content),
            card_type: clean_optional(self.card_type),
            position: self.position,
        })
    }
}

/// Meeting with every child collection, used by detail reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeetingDetail {
    #[serde(flatten)]
    pub meeting: Meeting,
    pub attendees: Vec<Attendee>,
    pub agenda: Vec<AgendaItem>,
    pub notes: Vec<MeetingNote>,
    pub questions: Vec<MeetingQuestion>,
    pub follow_ups: Vec<MeetingFollowUp>,
    pub context_cards: Vec<ContextCard>,
}
