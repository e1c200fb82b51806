//! Tech-stack, company and topic research.

use serde::{Deserialize, Serialize};

use crate::citations::{fetch_citations, Citation};
use crate::json::parse_reply;
use crate::provider::{AiError, ChatMessage, CompletionParams, CompletionProvider};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchSuggestion {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchRequest<'a> {
    pub subject: &'a str,
    /// Wire name of the research kind (`tech_stack`, `company`, `topic`).
    pub kind: &'a str,
    pub context: Option<&'a str>,
}

impl ResearchRequest<'_> {
    /// The question sent to both providers, stored as the result query.
    pub fn question(&self) -> String {
        let mut question = match self.kind {
            "company" => format!("Research the company {}.", self.subject),
            "topic" => format!("Research the topic {}.", self.subject),
            _ => format!("Recommend a technology stack for {}.", self.subject),
        };
        if let Some(context) = self.context.map(str::trim).filter(|text| !text.is_empty()) {
            question.push_str(&format!(" Context: {context}"));
        }
        question
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResearchOutcome {
    pub query: String,
    pub summary: Option<String>,
    pub suggestions: Vec<ResearchSuggestion>,
    pub citations: Vec<Citation>,
}

#[derive(Deserialize)]
struct ResearchReply {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    suggestions: Vec<ResearchSuggestion>,
}

/// Runs the chat model for structure, then the search model for sources.
///
/// Any chat failure aborts. A missing search provider yields no citations;
/// a failing one aborts.
pub async fn generate_research(
    chat: Option<&dyn CompletionProvider>,
    search: Option<&dyn CompletionProvider>,
    request: &ResearchRequest<'_>,
) -> Result<ResearchOutcome, AiError> {
    let chat = chat.ok_or(AiError::NotConfigured)?;
    let question = request.question();

    let messages = vec![
        ChatMessage::system(
            "You are a pragmatic research analyst. Respond with strict JSON only: \
             {\"summary\": string, \"suggestions\": [{\"name\": string, \
             \"category\": string|null, \"rationale\": string|null}]}.",
        ),
        ChatMessage::user(question.clone()),
    ];
    let reply = chat
        .complete(&messages, &CompletionParams::structured())
        .await?;
    let parsed: ResearchReply = parse_reply(&reply)?;
    let citations = fetch_citations(search, &question).await?;

    Ok(ResearchOutcome {
        query: question,
        summary: parsed.summary.filter(|text| !text.trim().is_empty()),
        suggestions: parsed
            .suggestions
            .into_iter()
            .filter(|suggestion| !suggestion.name.trim().is_empty())
            .collect(),
        citations,
    })
}

#[cfg(test)]
mod tests {
    use super::{generate_research, ResearchRequest};
    use crate::provider::testing::ScriptedProvider;

    #[tokio::test]
    async fn research_combines_structure_and_citations() {
        let chat = ScriptedProvider::replying(
            r#"{"summary": "Use boring tech", "suggestions": [{"name": "PostgreSQL", "category": "database"}, {"name": ""}]}"#,
        );
        let search = ScriptedProvider::replying(
            "Postgres is reliable [PostgreSQL docs](https://www.postgresql.org/docs/).",
        );
        let request = ResearchRequest {
            subject: "a payments startup",
            kind: "tech_stack",
            context: Some("small team"),
        };

        let outcome = generate_research(Some(&chat), Some(&search), &request)
            .await
            .expect("generate research should succeed");
        assert_eq!(outcome.summary.as_deref(), Some("Use boring tech"));
        assert_eq!(outcome.suggestions.len(), 1);
        assert_eq!(outcome.citations.len(), 1);
        assert!(outcome.query.contains("small team"));
    }

    #[tokio::test]
    async fn search_failure_aborts_research() {
        let chat = ScriptedProvider::replying(r#"{"summary": "x", "suggestions": []}"#);
        let search = ScriptedProvider::failing();
        let request = ResearchRequest {
            subject: "Acme",
            kind: "company",
            context: None,
        };
        assert!(generate_research(Some(&chat), Some(&search), &request)
            .await
            .is_err());
    }
}
