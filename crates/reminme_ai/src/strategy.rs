//! Conversation strategy generation.

use serde::{Deserialize, Serialize};

use crate::citations::{fetch_citations, Citation};
use crate::json::parse_reply;
use crate::provider::{AiError, ChatMessage, CompletionParams, CompletionProvider};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyRequest<'a> {
    pub situation: &'a str,
    pub goal: &'a str,
    /// One-line description of the counterpart, when known.
    pub person: Option<&'a str>,
    pub meetings: &'a [String],
    pub memories: &'a [String],
    pub people: &'a [String],
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedStep {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sample_phrase: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedStrategy {
    pub summary: Option<String>,
    pub steps: Vec<GeneratedStep>,
    pub citations: Vec<Citation>,
}

#[derive(Deserialize)]
struct StrategyReply {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    steps: Vec<GeneratedStep>,
}

fn context_section(title: &str, lines: &[String]) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let body = lines
        .iter()
        .map(|line| format!("- {line}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("\n\n{title}:\n{body}")
}

fn strategy_prompt(request: &StrategyRequest<'_>) -> String {
    let mut prompt = format!("Situation: {}\nGoal: {}", request.situation, request.goal);
    if let Some(person) = request.person {
        prompt.push_str(&format!("\nCounterpart: {person}"));
    }
    prompt.push_str(&context_section("Recent meetings", request.meetings));
    prompt.push_str(&context_section("Relevant memories", request.memories));
    prompt.push_str(&context_section("People I know", request.people));
    prompt
}

/// Generates a step-by-step plan plus supporting sources.
pub async fn generate_strategy(
    chat: Option<&dyn CompletionProvider>,
    search: Option<&dyn CompletionProvider>,
    request: &StrategyRequest<'_>,
) -> Result<GeneratedStrategy, AiError> {
    let chat = chat.ok_or(AiError::NotConfigured)?;

    let messages = vec![
        ChatMessage::system(
            "You are a conversation coach. Plan how to approach the conversation. \
             Respond with strict JSON only: {\"summary\": string, \"steps\": \
             [{\"title\": string, \"description\": string|null, \"sample_phrase\": string|null}]}.",
        ),
        ChatMessage::user(strategy_prompt(request)),
    ];
    let reply = chat
        .complete(&messages, &CompletionParams::structured())
        .await?;
    let parsed: StrategyReply = parse_reply(&reply)?;

    let search_question = format!(
        "Advice and research on how to handle this conversation: {} Goal: {}",
        request.situation, request.goal
    );
    let citations = fetch_citations(search, &search_question).await?;

    log::info!(
        "event=ai_strategy module=ai status=ok steps={} citations={}",
        parsed.steps.len(),
        citations.len()
    );
    Ok(GeneratedStrategy {
        summary: parsed.summary.filter(|text| !text.trim().is_empty()),
        steps: parsed.steps,
        citations,
    })
}

#[cfg(test)]
mod tests {
    use super::{generate_strategy, StrategyRequest};
    use crate::provider::testing::ScriptedProvider;
    use crate::provider::AiError;

    #[tokio::test]
    async fn strategy_includes_enabled_context_in_prompt() {
        let chat = ScriptedProvider::replying(
            r#"{"summary": "Be direct", "steps": [{"title": "Open"}, {"title": "Ask", "sample_phrase": "Could we..."}]}"#,
        );
        let meetings = vec!["Quarterly review: budget".to_string()];
        let request = StrategyRequest {
            situation: "Asking for budget",
            goal: "Get two hires approved",
            meetings: &meetings,
            ..StrategyRequest::default()
        };

        let strategy = generate_strategy(Some(&chat), None, &request)
            .await
            .expect("generate strategy should succeed");
        assert_eq!(strategy.steps.len(), 2);
        assert!(strategy.citations.is_empty());
        let prompt = chat.last_user_prompt();
        assert!(prompt.contains("Recent meetings"));
        assert!(!prompt.contains("People I know"));
    }

    #[tokio::test]
    async fn chat_failure_aborts_without_calling_search() {
        let chat = ScriptedProvider::failing();
        let search = ScriptedProvider::replying("[a](https://a.example)");
        let request = StrategyRequest {
            situation: "s",
            goal: "g",
            ..StrategyRequest::default()
        };
        assert!(matches!(
            generate_strategy(Some(&chat), Some(&search), &request).await,
            Err(AiError::Timeout)
        ));
        assert!(search.prompts.lock().expect("lock should not be poisoned").is_empty());
    }
}
