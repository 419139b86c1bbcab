//! Parse LLM output into a category-keyed JSON object

use crate::error::AnalysisError;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::{debug, warn};

static FENCED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n(.*?)\r?\n?```").expect("valid regex"));
static OBJECT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

/// Which attempt produced the parsed object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStrategy {
    /// The (unfenced) reply parsed as-is
    Strict,
    /// The first-to-last brace span of the raw reply parsed
    Recovered,
}

/// A successfully parsed reply
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    /// Category-keyed object; categories may be missing
    pub value: Map<String, Value>,
    /// How it was obtained
    pub strategy: ParseStrategy,
}

/// Parse an LLM reply
///
/// Strips whitespace and markdown fences, then tries a strict parse. On
/// failure, parses the greedy `{...}` span of the raw reply. Fails with
/// [`AnalysisError::MalformedResponse`] carrying the raw text when neither
/// yields a JSON object.
pub fn parse_llm_response(raw: &str) -> Result<ParsedResponse, AnalysisError> {
    let stripped = strip_fences(raw);
    if let Some(value) = parse_object(stripped) {
        return Ok(ParsedResponse {
            value,
            strategy: ParseStrategy::Strict,
        });
    }

    debug!("Strict parse failed, trying brace recovery");
    if let Some(value) = OBJECT_RE.find(raw).and_then(|m| parse_object(m.as_str())) {
        return Ok(ParsedResponse {
            value,
            strategy: ParseStrategy::Recovered,
        });
    }

    warn!(chars = raw.len(), "LLM response is not a JSON object");
    Err(AnalysisError::MalformedResponse { raw: raw.to_string() })
}

/// Strip surrounding whitespace and markdown code fences
fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(inner) = FENCED_RE.captures(trimmed).and_then(|c| c.get(1)) {
        return inner.as_str().trim();
    }
    // Unterminated fence
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open.strip_suffix("```").unwrap_or(without_open).trim()
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_plain_object() {
        let parsed = parse_llm_response(r#"{"characters": [{"name": "Alice"}]}"#).unwrap();
        assert_eq!(parsed.strategy, ParseStrategy::Strict);
        assert_eq!(parsed.value["characters"][0]["name"], json!("Alice"));
    }

    #[test]
    fn test_fenced_reply_after_chatter_is_strict() {
        let parsed = parse_llm_response("Sure! ```json\n{\"characters\": []}\n```").unwrap();
        assert_eq!(parsed.strategy, ParseStrategy::Strict);
        assert_eq!(parsed.value["characters"], json!([]));
    }

    #[test]
    fn test_fence_without_language() {
        let parsed = parse_llm_response("```\n{\"themes\": []}\n```").unwrap();
        assert_eq!(parsed.strategy, ParseStrategy::Strict);
    }

    #[test]
    fn test_unterminated_fence() {
        let parsed = parse_llm_response("```json\n{\"scenes\": []}").unwrap();
        assert_eq!(parsed.strategy, ParseStrategy::Strict);
    }

    #[test]
    fn test_prose_around_object_is_recovered() {
        let parsed =
            parse_llm_response("Here you go: {\"locations\": [{\"name\": \"attic\"}]} Hope it helps!")
                .unwrap();
        assert_eq!(parsed.strategy, ParseStrategy::Recovered);
        assert_eq!(parsed.value["locations"][0]["name"], json!("attic"));
    }

    #[test]
    fn test_no_json_is_malformed() {
        let err = parse_llm_response("I cannot help with that.").unwrap_err();
        match err {
            AnalysisError::MalformedResponse { raw } => assert_eq!(raw, "I cannot help with that."),
            other => panic!("Expected MalformedResponse, got {other:?}"),
        }
    }

    #[test]
    fn test_array_is_not_an_object() {
        assert!(parse_llm_response("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_missing_categories_tolerated() {
        let parsed = parse_llm_response("{}").unwrap();
        assert!(parsed.value.is_empty());
    }
}
