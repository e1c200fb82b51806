//! Generated research results and conversation strategies.

use super::{RecordId, UserId};
use serde::{Deserialize, Serialize};

/// Source link cited by a search-augmented completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchKind {
    #[default]
    TechStack,
    Company,
    Topic,
}

impl ResearchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TechStack => "tech_stack",
            Self::Company => "company",
            Self::Topic => "topic",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "tech_stack" => Some(Self::TechStack),
            "company" => Some(Self::Company),
            "topic" => Some(Self::Topic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchSuggestion {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub id: RecordId,
    pub user_id: UserId,
    pub business_id: Option<RecordId>,
    pub kind: ResearchKind,
    pub subject: String,
    pub query: String,
    pub summary: Option<String>,
    pub suggestions: Vec<ResearchSuggestion>,
    pub citations: Vec<Citation>,
    pub created_at: i64,
}

/// Generated research ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResearchResult {
    pub business_id: Option<RecordId>,
    pub kind: ResearchKind,
    pub subject: String,
    pub query: String,
    pub summary: Option<String>,
    pub suggestions: Vec<ResearchSuggestion>,
    pub citations: Vec<Citation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationStrategy {
    pub id: RecordId,
    pub user_id: UserId,
    pub person_id: Option<RecordId>,
    pub situation: String,
    pub goal: String,
    pub summary: Option<String>,
    pub citations: Vec<Citation>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationStep {
    pub id: RecordId,
    pub strategy_id: RecordId,
    pub position: i64,
    pub title: String,
    pub description: Option<String>,
    pub sample_phrase: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConversationStep {
    pub title: String,
    pub description: Option<String>,
    pub sample_phrase: Option<String>,
}

/// Generated strategy with its steps, inserted as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConversationStrategy {
    pub person_id: Option<RecordId>,
    pub situation: String,
    pub goal: String,
    pub summary: Option<String>,
    pub citations: Vec<Citation>,
    pub steps: Vec<NewConversationStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyDetail {
    #[serde(flatten)]
    pub strategy: ConversationStrategy,
    pub steps: Vec<ConversationStep>,
}
