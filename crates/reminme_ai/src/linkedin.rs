//! LinkedIn profile text import.

use serde::{Deserialize, Serialize};

use crate::json::parse_reply;
use crate::provider::{AiError, ChatMessage, CompletionParams, CompletionProvider};

const LINKEDIN_INSTRUCTION: &str = "You read text copied from a LinkedIn profile page. \
Respond with strict JSON only: {\"name\": string, \"headline\": string|null, \
\"company\": string|null, \"location\": string|null, \"summary\": string|null, \
\"linkedin_url\": string|null}. headline is the person's current role.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedInProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "role")]
    pub headline: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
}

/// Extracts profile fields from pasted profile text.
///
/// # Errors
/// - `ParseError` when the model answers without a name.
pub async fn parse_linkedin_profile(
    provider: Option<&dyn CompletionProvider>,
    text: &str,
) -> Result<LinkedInProfile, AiError> {
    let provider = provider.ok_or(AiError::NotConfigured)?;
    let messages = vec![
        ChatMessage::system(LINKEDIN_INSTRUCTION),
        ChatMessage::user(text),
    ];
    let reply = provider
        .complete(&messages, &CompletionParams::structured())
        .await?;
    let mut profile: LinkedInProfile = parse_reply(&reply)?;

    profile.name = profile.name.trim().to_string();
    if profile.name.is_empty() {
        return Err(AiError::ParseError("profile has no name".to_string()));
    }
    Ok(profile)
}
