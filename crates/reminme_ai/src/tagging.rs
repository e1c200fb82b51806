//! Best-effort keyword, entity and industry tagging of free text.
//!
//! # Invariants
//! - `tag_text` never fails: any provider, transport or parse problem
//!   degrades to empty arrays and a `warn` log line.
//! - Each returned array is trimmed, deduplicated case-insensitively and
//!   capped at `MAX_TAGS`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::json::parse_reply;
use crate::provider::{ChatMessage, CompletionParams, CompletionProvider};

pub const MAX_TAGS: usize = 10;

const TAGGING_INSTRUCTION: &str = "You extract metadata from personal notes. \
Respond with strict JSON only, no prose: \
{\"keywords\": [string], \"entities\": [string], \"industries\": [string]}. \
keywords are short topical phrases, entities are named people, companies, \
products or places, industries are business sectors. Use empty arrays when \
nothing applies.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiTags {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub industries: Vec<String>,
}

impl AiTags {
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.entities.is_empty() && self.industries.is_empty()
    }

    fn normalized(self) -> Self {
        Self {
            keywords: normalize(self.keywords),
            entities: normalize(self.entities),
            industries: normalize(self.industries),
        }
    }
}

fn normalize(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter_map(|value| {
            let trimmed = value.trim();
            (!trimmed.is_empty() && seen.insert(trimmed.to_lowercase()))
                .then(|| trimmed.to_string())
        })
        .take(MAX_TAGS)
        .collect()
}

/// Tags `text`, optionally noting who the text is about.
pub async fn tag_text(
    provider: Option<&dyn CompletionProvider>,
    text: &str,
    subject_name: Option<&str>,
) -> AiTags {
    let Some(provider) = provider else {
        return AiTags::default();
    };
    if text.trim().is_empty() {
        return AiTags::default();
    }

    let prompt = match subject_name.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => format!("This note is about {name}.\n\n{text}"),
        None => text.to_string(),
    };
    let messages = vec![
        ChatMessage::system(TAGGING_INSTRUCTION),
        ChatMessage::user(prompt),
    ];

    let reply = match provider
        .complete(&messages, &CompletionParams::structured())
        .await
    {
        Ok(reply) => reply,
        Err(err) => {
            log::warn!(
                "event=ai_tag module=ai status=error provider={} error={}",
                provider.name(),
                err
            );
            return AiTags::default();
        }
    };

    match parse_reply::<AiTags>(&reply) {
        Ok(tags) => tags.normalized(),
        Err(err) => {
            log::warn!(
                "event=ai_tag module=ai status=error provider={} error={}",
                provider.name(),
                err
            );
            AiTags::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{tag_text, MAX_TAGS};
    use crate::provider::testing::ScriptedProvider;

    #[tokio::test]
    async fn tags_are_parsed_and_normalized() {
        let provider = ScriptedProvider::replying(
            "```json\n{\"keywords\": [\" Rust \", \"rust\", \"\"], \"entities\": [\"Mozilla\"], \"industries\": []}\n```",
        );
        let tags = tag_text(Some(&provider), "Talked about Rust at Mozilla", Some("Ada")).await;
        assert_eq!(tags.keywords, vec!["Rust".to_string()]);
        assert_eq!(tags.entities, vec!["Mozilla".to_string()]);
        assert!(tags.industries.is_empty());
        assert!(provider.last_user_prompt().contains("about Ada"));
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_empty_tags() {
        let provider = ScriptedProvider::failing();
        assert!(tag_text(Some(&provider), "anything", None).await.is_empty());
    }

    #[tokio::test]
    async fn malformed_reply_degrades_to_empty_tags() {
        let provider = ScriptedProvider::replying("I could not find anything.");
        assert!(tag_text(Some(&provider), "anything", None).await.is_empty());
    }

    #[tokio::test]
    async fn missing_provider_degrades_to_empty_tags() {
        assert!(tag_text(None, "anything", None).await.is_empty());
    }

    #[tokio::test]
    async fn arrays_are_capped() {
        let many: Vec<String> = (0..25).map(|idx| format!("\"k{idx}\"")).collect();
        let reply = format!("{{\"keywords\": [{}]}}", many.join(","));
        let provider = ScriptedProvider::replying(&reply);
        let tags = tag_text(Some(&provider), "long text", None).await;
        assert_eq!(tags.keywords.len(), MAX_TAGS);
    }
}
