//! Businesses, their contacts, notes and org chart.
//!
//! # Invariants
//! - Only `Business::name` is required; every other attribute is nullable.
//! - Org charts are saved as a whole set (replace semantics). Keys inside an
//!   `OrgChartDraft` are client-side references, never persisted ids.

use super::{clean_optional, require_text, RecordId, Tags, UserId, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Business {
    pub id: RecordId,
    pub user_id: UserId,
    pub name: String,
    pub industry: Option<String>,
    pub stage: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BusinessDraft {
    pub name: String,
    pub industry: Option<String>,
    pub stage: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

impl BusinessDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn cleaned(self) -> Result<Self, ValidationError> {
        require_text("name", &self.name)?;
        Ok(Self {
            name: self.name.trim().to_string(),
            industry: clean_optional(self.industry),
            stage: clean_optional(self.stage),
            website: clean_optional(self.website),
            description: clean_optional(self.description),
            notes: clean_optional(self.notes),
        })
    }
}

/// Contact at a business. Distinct from the owner's personal `Person` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessPerson {
    pub id: RecordId,
    pub business_id: RecordId,
    pub name: String,
    pub role: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BusinessPersonDraft {
    pub name: String,
    pub role: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
}

impl BusinessPersonDraft {
    pub fn cleaned(self) -> Result<Self, ValidationError> {
        require_text("name", &self.name)?;
        Ok(Self {
            name: self.name.trim().to_string(),
            role: clean_optional(self.role),
            email: clean_optional(self.email),
            notes: clean_optional(self.notes),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessNote {
    pub id: RecordId,
    pub business_id: RecordId,
    pub content: String,
    #[serde(flatten)]
    pub tags: Tags,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrgChartPerson {
    pub id: RecordId,
    pub name: String,
    pub title: Option<String>,
    pub reports_to: Option<RecordId>,
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrgChartTeam {
    pub id: RecordId,
    pub name: String,
    pub position: i64,
    pub member_ids: Vec<RecordId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrgChartMeeting {
    pub id: RecordId,
    pub title: String,
    pub cadence: Option<String>,
    pub team_id: Option<RecordId>,
    pub position: i64,
}

/// Persisted org chart for one business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrgChart {
    pub business_id: RecordId,
    pub people: Vec<OrgChartPerson>,
    pub teams: Vec<OrgChartTeam>,
    pub meetings: Vec<OrgChartMeeting>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OrgPersonDraft {
    /// Client-side reference used by `reports_to` and team membership.
    pub key: Option<String>,
    pub name: String,
    pub title: Option<String>,
    pub reports_to: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OrgTeamDraft {
    pub key: Option<String>,
    pub name: String,
    pub member_keys: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OrgMeetingDraft {
    pub title: String,
    pub cadence: Option<String>,
    pub team_key: Option<String>,
}

/// Full replacement payload for an org chart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OrgChartDraft {
    pub people: Vec<OrgPersonDraft>,
    pub teams: Vec<OrgTeamDraft>,
    pub meetings: Vec<OrgMeetingDraft>,
}

impl OrgChartDraft {
    /// Checks required names and that every key reference resolves.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut person_keys = BTreeSet::new();
        for person in &self.people {
            require_text("people.name", &person.name)?;
            if let Some(key) = person.key.as_deref() {
                if !person_keys.insert(key) {
                    return Err(ValidationError::new("people.key", "must be unique"));
                }
            }
        }
        for person in &self.people {
            if let Some(target) = person.reports_to.as_deref() {
                if !person_keys.contains(target) {
                    return Err(ValidationError::new(
                        "people.reports_to",
                        "must reference a person key in the same chart",
                    ));
                }
                if person.key.as_deref() == Some(target) {
                    return Err(ValidationError::new(
                        "people.reports_to",
                        "cannot reference the same person",
                    ));
                }
            }
        }

        let mut team_keys = BTreeSet::new();
        for team in &self.teams {
            require_text("teams.name", &team.name)?;
            if let Some(key) = team.key.as_deref() {
                if !team_keys.insert(key) {
                    return Err(ValidationError::new("teams.key", "must be unique"));
                }
            }
            if team
                .member_keys
                .iter()
                .any(|member| !person_keys.contains(member.as_str()))
            {
                return Err(ValidationError::new(
                    "teams.member_keys",
                    "must reference person keys in the same chart",
                ));
            }
        }

        for meeting in &self.meetings {
            require_text("meetings.title", &meeting.title)?;
            if let Some(team_key) = meeting.team_key.as_deref() {
                if !team_keys.contains(team_key) {
                    return Err(ValidationError::new(
                        "meetings.team_key",
                        "must reference a team key in the same chart",
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{OrgChartDraft, OrgPersonDraft, OrgTeamDraft};

    fn person(key: &str, reports_to: Option<&str>) -> OrgPersonDraft {
        OrgPersonDraft {
            key: Some(key.to_string()),
            name: format!("person {key}"),
            title: None,
            reports_to: reports_to.map(str::to_string),
        }
    }

    #[test]
    fn org_chart_rejects_dangling_reports_to() {
        let draft = OrgChartDraft {
            people: vec![person("a", Some("missing"))],
            ..OrgChartDraft::default()
        };
        assert_eq!(draft.validate().unwrap_err().field, "people.reports_to");
    }

    #[test]
    fn org_chart_rejects_unknown_team_member() {
        let draft = OrgChartDraft {
            people: vec![person("a", None)],
            teams: vec![OrgTeamDraft {
                key: Some("t".to_string()),
                name: "Platform".to_string(),
                member_keys: vec!["b".to_string()],
            }],
            ..OrgChartDraft::default()
        };
        assert_eq!(draft.validate().unwrap_err().field, "teams.member_keys");
    }

    #[test]
    fn empty_org_chart_is_valid() {
        assert!(OrgChartDraft::default().validate().is_ok());
    }
}
