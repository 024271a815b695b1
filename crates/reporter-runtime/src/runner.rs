//! The bounded action-JSON conversation loop.
//!
//! Each turn sends the model a self-contained instruction payload (task,
//! allowed tools, context, recent observations) and demands pure JSON
//! back. The model either requests one tool call or emits a final draft;
//! anything else burns a step. Exhaustion yields a fallback draft -- a
//! normal loop never surfaces an error to the caller.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use crate::draft::AnalysisDraft;
use crate::model::ModelClient;
use crate::parse;
use crate::tools::{preview_of, ToolCallTrace, ToolExecutor, ToolObservation};

/// Observations replayed to the model each turn; older ones are dropped to
/// bound token usage and keep the model on recent evidence.
const OBSERVATION_WINDOW: usize = 8;

const SYSTEM_PROMPT: &str = "You are a market analysis engine. Respond with exactly one JSON \
     object and no other text. Request data with \
     {\"action\":\"call_tool\",\"tool\":\"<name>\",\"arguments\":{...}} or finish with \
     {\"action\":\"final\",\"final\":{...}}.";

/// Budgets for one runtime invocation.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Maximum model turns.
    pub max_steps: usize,

    /// Maximum tool invocations across the whole loop.
    pub max_tool_calls: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_steps: 8,
            max_tool_calls: 6,
        }
    }
}

/// One analysis task handed to the runtime.
#[derive(Debug, Clone)]
pub struct RuntimeRequest {
    /// Natural-language task description.
    pub task: String,

    /// Caller-defined mode tag (e.g. "daily-report").
    pub mode: String,

    /// Opaque context the model may draw on.
    pub context: Value,

    /// Tool names the model is allowed to request.
    pub allowed_tools: Vec<String>,
}

/// What a runtime invocation hands back: always a draft, plus the audit
/// trail of tool calls made along the way.
#[derive(Debug)]
pub struct RuntimeOutcome {
    pub draft: AnalysisDraft,
    pub trace: Vec<ToolCallTrace>,
}

/// Drives the model/tool conversation for one analysis request.
pub struct ToolCallingRuntime {
    model: Arc<dyn ModelClient>,
    tools: Arc<dyn ToolExecutor>,
    config: RuntimeConfig,
}

impl ToolCallingRuntime {
    /// Create a runtime with default budgets.
    pub fn new(model: Arc<dyn ModelClient>, tools: Arc<dyn ToolExecutor>) -> Self {
        Self {
            model,
            tools,
            config: RuntimeConfig::default(),
        }
    }

    /// Override the step and tool-call budgets.
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the loop to completion.
    ///
    /// Tool calls execute strictly one at a time in request order. If the
    /// caller drops the returned future no further model or tool calls are
    /// issued; an in-flight tool call is not interrupted and its late
    /// result is discarded with the future.
    pub async fn run(&self, request: &RuntimeRequest) -> RuntimeOutcome {
        let mut observations: Vec<ToolObservation> = Vec::new();
        let mut trace: Vec<ToolCallTrace> = Vec::new();
        let mut tool_calls = 0usize;

        for step in 0..self.config.max_steps {
            let prompt = build_prompt(request, &observations);

            let response = match self.model.complete(&prompt, SYSTEM_PROMPT).await {
                Ok(text) => text,
                Err(e) => {
                    // A failed or timed-out model call reads like an
                    // unparseable response: end the loop, keep the trace.
                    debug!(step, error = %e, "model call failed; ending loop");
                    break;
                }
            };

            let Some(parsed) = parse::extract_object(&response) else {
                debug!(step, "no JSON object in model response; ending loop");
                break;
            };

            match parsed.get("action").and_then(Value::as_str) {
                Some("call_tool") if tool_calls < self.config.max_tool_calls => {
                    let tool = parsed
                        .get("tool")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    let arguments = match parsed.get("arguments") {
                        Some(value @ Value::Object(_)) => value.clone(),
                        _ => json!({}),
                    };

                    debug!(step, tool = %tool, "executing tool");
                    let result = match self.tools.execute(&tool, &arguments).await {
                        Ok(value) => value,
                        Err(e) => json!({ "error": e.to_string() }),
                    };
                    tool_calls += 1;

                    trace.push(ToolCallTrace {
                        tool: tool.clone(),
                        arguments: arguments.clone(),
                        result_preview: preview_of(&result),
                    });
                    observations.push(ToolObservation {
                        step,
                        tool,
                        arguments,
                        result,
                    });
                }
                Some("final") => {
                    let final_value = parsed.get("final").cloned().unwrap_or(Value::Null);
                    debug!(step, tool_calls, "model produced a final draft");
                    return RuntimeOutcome {
                        draft: AnalysisDraft::from_model_value(final_value),
                        trace,
                    };
                }
                other => {
                    // Unknown action, or a tool request past the budget:
                    // burn the step and ask again.
                    debug!(step, action = ?other, tool_calls, "no usable action this turn");
                }
            }
        }

        debug!(tool_calls, "loop exhausted without a final draft");
        RuntimeOutcome {
            draft: AnalysisDraft::fallback(&request.context),
            trace,
        }
    }
}

/// Assemble the self-contained instruction payload for one model turn.
fn build_prompt(request: &RuntimeRequest, observations: &[ToolObservation]) -> String {
    let window_start = observations.len().saturating_sub(OBSERVATION_WINDOW);

    json!({
        "task": request.task,
        "mode": request.mode,
        "context": request.context,
        "available_tools": request.allowed_tools,
        "observations": &observations[window_start..],
        "response_contract": {
            "call_tool": {
                "action": "call_tool",
                "tool": "<one of available_tools>",
                "arguments": {}
            },
            "final": {
                "action": "final",
                "final": {
                    "summary": "",
                    "sentiment": "bullish | neutral | bearish",
                    "key_levels": [],
                    "risks": [],
                    "action_items": [],
                    "confidence": 0.0,
                    "conclusions": [],
                    "scenario_assumptions": { "base": "", "bull": "", "bear": "" },
                    "markdown": ""
                }
            }
        }
    })
    .to_string()
}
