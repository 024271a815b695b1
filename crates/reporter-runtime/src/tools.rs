//! Tool execution seam and per-call bookkeeping.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// How many entries of a list-valued result field survive into a trace.
const PREVIEW_LIST_LIMIT: usize = 3;

/// Error returned by a tool executor.
///
/// Inside the loop these are folded into the observation stream as error
/// results; they never abort an analysis.
#[derive(Debug, Error)]
#[error("Tool '{tool}' failed: {message}")]
pub struct ToolError {
    pub tool: String,
    pub message: String,
}

impl ToolError {
    /// Create a tool error.
    pub fn new(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Executes named data tools on behalf of the runtime.
///
/// Implementations are supplied by the caller; the runtime invokes them
/// strictly one at a time, in the order the model requested.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute a named tool with JSON arguments, returning a JSON result.
    async fn execute(&self, name: &str, arguments: &Value) -> Result<Value, ToolError>;
}

/// Record of one tool call, replayed to the model as context.
///
/// Held in memory for the current loop only; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ToolObservation {
    pub step: usize,
    pub tool: String,
    pub arguments: Value,
    pub result: Value,
}

/// Audit entry returned to the caller.
///
/// `result_preview` carries a bounded copy of the result: list-valued
/// fields longer than three entries are truncated with a sibling count.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallTrace {
    pub tool: String,
    pub arguments: Value,
    pub result_preview: Value,
}

/// Build a bounded preview of a tool result.
///
/// For object results, each list-valued field longer than
/// [`PREVIEW_LIST_LIMIT`] is cut to its first entries and a
/// `<field>_count` sibling records the original length. Other shapes pass
/// through unchanged.
pub fn preview_of(result: &Value) -> Value {
    let Value::Object(fields) = result else {
        return result.clone();
    };

    let mut preview = Map::new();
    for (key, value) in fields {
        match value {
            Value::Array(items) if items.len() > PREVIEW_LIST_LIMIT => {
                preview.insert(
                    key.clone(),
                    Value::Array(items[..PREVIEW_LIST_LIMIT].to_vec()),
                );
                preview.insert(format!("{key}_count"), Value::from(items.len()));
            }
            other => {
                preview.insert(key.clone(), other.clone());
            }
        }
    }
    Value::Object(preview)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_short_lists_pass_through() {
        let result = json!({"headlines": ["a", "b"], "symbol": "AAPL"});
        assert_eq!(preview_of(&result), result);
    }

    #[test]
    fn test_long_lists_are_truncated_with_count() {
        let result = json!({"headlines": ["a", "b", "c", "d", "e"]});
        let preview = preview_of(&result);
        assert_eq!(preview["headlines"], json!(["a", "b", "c"]));
        assert_eq!(preview["headlines_count"], json!(5));
    }

    #[test]
    fn test_multiple_fields_are_trimmed_independently() {
        let result = json!({
            "headlines": ["a", "b", "c", "d"],
            "quotes": [1, 2],
            "source": "newswire"
        });
        let preview = preview_of(&result);
        assert_eq!(preview["headlines_count"], json!(4));
        assert_eq!(preview["quotes"], json!([1, 2]));
        assert!(preview.get("quotes_count").is_none());
        assert_eq!(preview["source"], json!("newswire"));
    }

    #[test]
    fn test_non_object_results_pass_through() {
        assert_eq!(preview_of(&json!("plain text")), json!("plain text"));
        assert_eq!(preview_of(&json!([1, 2, 3, 4])), json!([1, 2, 3, 4]));
        assert_eq!(preview_of(&Value::Null), Value::Null);
    }
}
