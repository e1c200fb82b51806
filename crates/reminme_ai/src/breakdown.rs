//! Task breakdown into subtasks.

use serde::{Deserialize, Serialize};

use crate::json::parse_reply;
use crate::provider::{AiError, ChatMessage, CompletionParams, CompletionProvider};

pub const MAX_SUBTASKS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSubtask {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
struct BreakdownReply {
    #[serde(default)]
    subtasks: Vec<GeneratedSubtask>,
}

/// Splits a task into at most `MAX_SUBTASKS` concrete steps.
pub async fn breakdown_task(
    provider: Option<&dyn CompletionProvider>,
    project: &str,
    title: &str,
    description: Option<&str>,
) -> Result<Vec<GeneratedSubtask>, AiError> {
    let provider = provider.ok_or(AiError::NotConfigured)?;

    let mut prompt = format!("Project: {project}\nTask: {title}\n");
    if let Some(description) = description {
        prompt.push_str(&format!("Details: {description}\n"));
    }
    let messages = vec![
        ChatMessage::system(format!(
            "You break tasks into small actionable subtasks. Respond with strict JSON only: \
             {{\"subtasks\": [{{\"title\": string, \"description\": string|null}}]}}. \
             Return at most {MAX_SUBTASKS} subtasks."
        )),
        ChatMessage::user(prompt),
    ];
    let reply = provider
        .complete(&messages, &CompletionParams::structured())
        .await?;
    let parsed: BreakdownReply = parse_reply(&reply)?;

    Ok(parsed
        .subtasks
        .into_iter()
        .filter(|subtask| !subtask.title.trim().is_empty())
        .take(MAX_SUBTASKS)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{breakdown_task, MAX_SUBTASKS};
    use crate::provider::testing::ScriptedProvider;

    #[tokio::test]
    async fn subtasks_are_capped() {
        let items: Vec<String> = (0..14)
            .map(|idx| format!(r#"{{"title": "step {idx}"}}"#))
            .collect();
        let reply = format!(r#"{{"subtasks": [{}]}}"#, items.join(","));
        let provider = ScriptedProvider::replying(&reply);
        let subtasks = breakdown_task(Some(&provider), "Move", "Pack", None)
            .await
            .expect("breakdown task should succeed");
        assert_eq!(subtasks.len(), MAX_SUBTASKS);
        assert_eq!(subtasks[0].title, "step 0");
    }
}
