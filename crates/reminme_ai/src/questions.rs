//! Meeting question generation.

use serde::{Deserialize, Serialize};

use crate::json::parse_reply;
use crate::provider::{AiError, ChatMessage, CompletionParams, CompletionProvider};

pub const DEFAULT_QUESTION_COUNT: u32 = 5;
pub const MAX_QUESTION_COUNT: u32 = 15;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Deserialize)]
struct QuestionsReply {
    #[serde(default)]
    questions: Vec<GeneratedQuestion>,
}

/// Clamps a requested question count into `1..=MAX_QUESTION_COUNT`.
pub fn question_count(requested: Option<u32>) -> u32 {
    match requested {
        None | Some(0) => DEFAULT_QUESTION_COUNT,
        Some(count) => count.min(MAX_QUESTION_COUNT),
    }
}

/// Generates up to `count` questions for the meeting described by `brief`.
pub async fn generate_questions(
    provider: Option<&dyn CompletionProvider>,
    brief: &str,
    count: Option<u32>,
) -> Result<Vec<GeneratedQuestion>, AiError> {
    let provider = provider.ok_or(AiError::NotConfigured)?;
    let count = question_count(count);

    let messages = vec![
        ChatMessage::system(
            "You help people prepare for meetings. Respond with strict JSON only: \
             {\"questions\": [{\"question\": string, \"category\": string|null}]}. \
             Avoid repeating questions that are already planned.",
        ),
        ChatMessage::user(format!(
            "Suggest {count} questions to ask in this meeting.\n\n{brief}"
        )),
    ];
    let reply = provider
        .complete(&messages, &CompletionParams::structured())
        .await?;
    let parsed: QuestionsReply = parse_reply(&reply)?;

    Ok(parsed
        .questions
        .into_iter()
        .filter(|question| !question.question.trim().is_empty())
        .take(count as usize)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{generate_questions, question_count, DEFAULT_QUESTION_COUNT, MAX_QUESTION_COUNT};
    use crate::provider::testing::ScriptedProvider;

    #[test]
    fn count_defaults_and_caps() {
        assert_eq!(question_count(None), DEFAULT_QUESTION_COUNT);
        assert_eq!(question_count(Some(0)), DEFAULT_QUESTION_COUNT);
        assert_eq!(question_count(Some(99)), MAX_QUESTION_COUNT);
        assert_eq!(question_count(Some(3)), 3);
    }

    #[tokio::test]
    async fn generated_questions_are_trimmed_to_count() {
        let provider = ScriptedProvider::replying(
            r#"{"questions": [{"question": "One?"}, {"question": " "}, {"question": "Two?"}, {"question": "Three?"}]}"#,
        );
        let questions = generate_questions(Some(&provider), "Title: Sync", Some(2))
            .await
            .expect("generate questions should succeed");
        let texts: Vec<&str> = questions.iter().map(|q| q.question.as_str()).collect();
        assert_eq!(texts, vec!["One?", "Two?"]);
        assert!(provider.last_user_prompt().contains("Suggest 2 questions"));
    }
}
