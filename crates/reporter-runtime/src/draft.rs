//! Structured analysis drafts produced by the tool-calling loop.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Confidence assigned when the loop exhausts without a final action.
const FALLBACK_CONFIDENCE: f64 = 0.35;

/// Maximum length of the context excerpt embedded in a fallback draft.
const CONTEXT_EXCERPT_LIMIT: usize = 1500;

/// Directional read on the analyzed instrument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    #[default]
    Neutral,
    Bearish,
}

/// Narrative assumptions per scenario.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioAssumptions {
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub bull: String,
    #[serde(default)]
    pub bear: String,
}

/// The structured final output of one runtime invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisDraft {
    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub sentiment: Sentiment,

    #[serde(default)]
    pub key_levels: Vec<String>,

    #[serde(default)]
    pub risks: Vec<String>,

    #[serde(default)]
    pub action_items: Vec<String>,

    /// Model self-assessment in [0, 1].
    #[serde(default = "default_confidence")]
    pub confidence: f64,

    #[serde(default)]
    pub conclusions: Vec<String>,

    #[serde(default)]
    pub scenario_assumptions: ScenarioAssumptions,

    #[serde(default)]
    pub markdown: String,

    /// The model's `final` object as received, untouched.
    #[serde(default)]
    pub raw: Value,
}

fn default_confidence() -> f64 {
    0.5
}

impl AnalysisDraft {
    /// Coerce a model-supplied `final` object into a draft.
    ///
    /// Field-by-field: a field of the wrong shape falls back to its
    /// default instead of discarding the rest of the object. Confidence is
    /// clamped to [0, 1]; the original value is preserved in `raw`.
    pub fn from_model_value(value: Value) -> Self {
        let empty = serde_json::Map::new();
        let fields = value.as_object().unwrap_or(&empty);

        let confidence = fields
            .get("confidence")
            .and_then(Value::as_f64)
            .unwrap_or_else(default_confidence)
            .clamp(0.0, 1.0);

        let sentiment = fields
            .get("sentiment")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        let scenario_assumptions = fields
            .get("scenario_assumptions")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        Self {
            summary: string_field(fields, "summary"),
            sentiment,
            key_levels: list_field(fields, "key_levels"),
            risks: list_field(fields, "risks"),
            action_items: list_field(fields, "action_items"),
            confidence,
            conclusions: list_field(fields, "conclusions"),
            scenario_assumptions,
            markdown: string_field(fields, "markdown"),
            raw: value,
        }
    }

    /// Fixed low-confidence draft for loop exhaustion.
    ///
    /// A truncated dump of the analysis context goes into the markdown
    /// body so a human reviewer can see what the model was given.
    pub fn fallback(context: &Value) -> Self {
        let mut excerpt = context.to_string();
        if excerpt.len() > CONTEXT_EXCERPT_LIMIT {
            let cut = (0..=CONTEXT_EXCERPT_LIMIT)
                .rev()
                .find(|i| excerpt.is_char_boundary(*i))
                .unwrap_or(0);
            excerpt.truncate(cut);
            excerpt.push('…');
        }

        Self {
            summary: "Automated analysis did not complete; manual review recommended."
                .to_string(),
            sentiment: Sentiment::Neutral,
            key_levels: Vec::new(),
            risks: vec![
                "The model did not return complete JSON; this draft is a low-confidence \
                 placeholder."
                    .to_string(),
            ],
            action_items: Vec::new(),
            confidence: FALLBACK_CONFIDENCE,
            conclusions: Vec::new(),
            scenario_assumptions: ScenarioAssumptions::default(),
            markdown: format!(
                "## Incomplete analysis\n\nThe model did not produce a final structured \
                 result.\n\nContext excerpt:\n\n```json\n{excerpt}\n```\n"
            ),
            raw: Value::Null,
        }
    }
}

fn string_field(fields: &serde_json::Map<String, Value>, key: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Coerce a list field, accepting strings and stringifying scalars.
fn list_field(fields: &serde_json::Map<String, Value>, key: &str) -> Vec<String> {
    let Some(Value::Array(items)) = fields.get(key) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .collect()
}
