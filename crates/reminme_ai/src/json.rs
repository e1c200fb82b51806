//! Lenient extraction of the JSON object a model was asked to return.
//!
//! Models wrap JSON in code fences or surround it with prose; the first
//! balanced `{...}` object in the reply is taken as the answer.

use serde::de::DeserializeOwned;

use crate::provider::AiError;

/// Returns the first balanced JSON object in `text`, if any.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = balanced_end(bytes, start) {
            return Some(&text[start..=end]);
        }
        search_from = start + 1;
    }
    None
}

fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, byte) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match (escaped, byte) {
                (true, _) => escaped = false,
                (false, b'\\') => escaped = true,
                (false, b'"') => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extracts and deserializes the first JSON object in a model reply.
pub fn parse_reply<T: DeserializeOwned>(reply: &str) -> Result<T, AiError> {
    let object = extract_json_object(reply)
        .ok_or_else(|| AiError::ParseError("no JSON object in reply".to_string()))?;
    serde_json::from_str(object).map_err(|err| AiError::ParseError(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{extract_json_object, parse_reply};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reply {
        value: String,
    }

    #[test]
    fn extracts_object_from_code_fence() {
        let reply = "```json\n{\"value\": \"ok\"}\n```";
        assert_eq!(extract_json_object(reply), Some("{\"value\": \"ok\"}"));
    }

    #[test]
    fn extracts_first_object_surrounded_by_prose() {
        let reply = "Sure! Here it is: {\"value\": \"a}b\", \"n\": {\"x\": 1}} and {\"value\": \"second\"}";
        let parsed: Reply = parse_reply(reply).expect("parse reply should succeed");
        assert_eq!(parsed.value, "a}b");
    }

    #[test]
    fn skips_unbalanced_brace_before_object() {
        let reply = "{ broken ... {\"value\": \"late\"}";
        assert_eq!(extract_json_object(reply), Some("{\"value\": \"late\"}"));
        let reply = "use } then {\"value\": \"fine\"}";
        assert_eq!(extract_json_object(reply), Some("{\"value\": \"fine\"}"));
    }

    #[test]
    fn reply_without_object_is_parse_error() {
        assert!(parse_reply::<Reply>("no json here").is_err());
    }
}
