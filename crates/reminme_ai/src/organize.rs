//! Structuring free-form notes into people, memories, follow-ups and events.
//!
//! Failures are surfaced to the caller: structuring is an explicit request.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::json::parse_reply;
use crate::provider::{AiError, ChatMessage, CompletionParams, CompletionProvider};

const ORGANIZE_INSTRUCTION: &str = "You turn a personal note into structured records. \
Respond with strict JSON only: {\"person\": {\"name\": string, \"relationship\": string|null, \
\"company\": string|null, \"role\": string|null} | null, \"memories\": [string], \
\"follow_ups\": [{\"description\": string, \"due_date\": \"YYYY-MM-DD\"|null}], \
\"events\": [{\"title\": string, \"event_date\": \"YYYY-MM-DD\", \"description\": string|null}]}. \
Memories are standalone facts worth remembering. Resolve relative dates against today's date.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizedPerson {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub relationship: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizedFollowUp {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizedEvent {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub event_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Structured view of one free-form note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizedNote {
    #[serde(default)]
    pub person: Option<OrganizedPerson>,
    #[serde(default)]
    pub memories: Vec<String>,
    #[serde(default)]
    pub follow_ups: Vec<OrganizedFollowUp>,
    #[serde(default)]
    pub events: Vec<OrganizedEvent>,
}

/// Structures `text`. `person_name` pins the subject when the caller knows it.
pub async fn organize_text(
    provider: Option<&dyn CompletionProvider>,
    text: &str,
    person_name: Option<&str>,
    today: NaiveDate,
) -> Result<OrganizedNote, AiError> {
    let provider = provider.ok_or(AiError::NotConfigured)?;

    let mut prompt = format!("Today is {}.\n", today.format("%Y-%m-%d"));
    if let Some(name) = person_name.map(str::trim).filter(|name| !name.is_empty()) {
        prompt.push_str(&format!("The note is about {name}.\n"));
    }
    prompt.push('\n');
    prompt.push_str(text);

    let messages = vec![
        ChatMessage::system(ORGANIZE_INSTRUCTION),
        ChatMessage::user(prompt),
    ];
    let reply = provider
        .complete(&messages, &CompletionParams::structured())
        .await?;
    let mut note: OrganizedNote = parse_reply(&reply)?;

    if let Some(name) = person_name.map(str::trim).filter(|name| !name.is_empty()) {
        let person = note.person.get_or_insert_with(OrganizedPerson::default);
        if person.name.trim().is_empty() {
            person.name = name.to_string();
        }
    }
    log::info!(
        "event=ai_organize module=ai status=ok memories={} follow_ups={} events={}",
        note.memories.len(),
        note.follow_ups.len(),
        note.events.len()
    );
    Ok(note)
}
