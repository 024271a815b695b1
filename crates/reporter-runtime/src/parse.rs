//! Lenient extraction of a JSON object from model output.

use serde_json::Value;

/// Parse `text` as a JSON object, tolerating surrounding noise.
///
/// Two passes: decode the whole response, then fall back to the substring
/// from the first `{` to the last `}` -- models routinely wrap JSON in
/// prose or code fences. When several balanced objects are present the
/// outermost first-to-last span is used; this is a heuristic, not a full
/// parser. Returns `None` when no object can be recovered.
pub fn extract_object(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        if value.is_object() {
            return Some(value);
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }

    serde_json::from_str::<Value>(&text[start..=end])
        .ok()
        .filter(Value::is_object)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_object_parses_directly() {
        let value = extract_object(r#"{"action":"final"}"#).unwrap();
        assert_eq!(value["action"], "final");
    }

    #[test]
    fn test_object_wrapped_in_prose() {
        let text = r#"noise {"action":"final","final":{"summary":"x"}} trailing"#;
        let value = extract_object(text).unwrap();
        assert_eq!(value["final"]["summary"], "x");
    }

    #[test]
    fn test_object_wrapped_in_code_fence() {
        let text = "```json\n{\"action\":\"call_tool\",\"tool\":\"search_news\"}\n```";
        let value = extract_object(text).unwrap();
        assert_eq!(value["tool"], "search_news");
    }

    #[test]
    fn test_no_object_yields_none() {
        assert!(extract_object("I could not decide on an action.").is_none());
        assert!(extract_object("").is_none());
        assert!(extract_object("} backwards {").is_none());
    }

    #[test]
    fn test_non_object_json_yields_none() {
        assert!(extract_object("42").is_none());
        assert!(extract_object(r#""just a string""#).is_none());
        assert!(extract_object("[1, 2, 3]").is_none());
    }

    #[test]
    fn test_unbalanced_braces_yield_none() {
        assert!(extract_object(r#"prefix {"action": "final" suffix"#).is_none());
    }
}
