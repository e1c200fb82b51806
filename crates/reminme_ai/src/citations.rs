//! Citation extraction from search-augmented completions.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::provider::{AiError, ChatMessage, CompletionParams, CompletionProvider};

static MARKDOWN_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\]\n]+)\]\((https?://[^\s)]+)\)").expect("valid citation regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub url: String,
}

/// Extracts `[title](url)` links in order of appearance, first wins per URL.
pub fn extract_citations(text: &str) -> Vec<Citation> {
    let mut seen = HashSet::new();
    MARKDOWN_LINK_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let title = caps.get(1)?.as_str().trim();
            let url = caps.get(2)?.as_str();
            if title.is_empty() || !seen.insert(url.to_string()) {
                return None;
            }
            Some(Citation {
                title: title.to_string(),
                url: url.to_string(),
            })
        })
        .collect()
}

/// Asks the search-augmented provider about `question` and returns the
/// sources it linked. No provider means no citations.
pub async fn fetch_citations(
    search: Option<&dyn CompletionProvider>,
    question: &str,
) -> Result<Vec<Citation>, AiError> {
    let Some(search) = search else {
        return Ok(Vec::new());
    };

    let messages = vec![
        ChatMessage::system(
            "You are a research assistant. Answer briefly and cite every source \
             inline as a markdown link in the form [title](https://url).",
        ),
        ChatMessage::user(question),
    ];
    let reply = search
        .complete(&messages, &CompletionParams::default())
        .await?;
    let citations = extract_citations(&reply);
    log::info!(
        "event=ai_citations module=ai status=ok provider={} count={}",
        search.name(),
        citations.len()
    );
    Ok(citations)
}

#[cfg(test)]
mod tests {
    use super::{extract_citations, fetch_citations};
    use crate::provider::testing::ScriptedProvider;

    #[test]
    fn extracts_links_in_order_and_dedupes_by_url() {
        let text = "See [Rust book](https://doc.rust-lang.org/book/) and \
                    [Axum](https://docs.rs/axum) plus [The Book again](https://doc.rust-lang.org/book/).";
        let citations = extract_citations(text);
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].title, "Rust book");
        assert_eq!(citations[1].url, "https://docs.rs/axum");
    }

    #[test]
    fn ignores_non_http_links() {
        assert!(extract_citations("[local](file:///etc/passwd) [rel](/docs)").is_empty());
    }

    #[tokio::test]
    async fn missing_search_provider_yields_no_citations() {
        let citations = fetch_citations(None, "anything")
            .await
            .expect("fetch citations should succeed");
        assert!(citations.is_empty());
    }

    #[tokio::test]
    async fn search_failure_is_propagated() {
        let provider = ScriptedProvider::failing();
        assert!(fetch_citations(Some(&provider), "anything").await.is_err());
    }
}
