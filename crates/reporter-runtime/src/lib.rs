//! Model-in-the-loop analysis runtime for Market Reporter.
//!
//! Drives a bounded conversation in which a language model must either
//! request a data tool or emit a final structured draft, tolerating
//! malformed model output. Callers always receive a usable draft; loop
//! exhaustion produces a low-confidence fallback, never an error.

pub mod draft;
pub mod model;
pub mod parse;
pub mod runner;
pub mod tools;

pub use draft::{AnalysisDraft, ScenarioAssumptions, Sentiment};
pub use model::{ModelCallError, ModelClient};
pub use runner::{RuntimeConfig, RuntimeOutcome, RuntimeRequest, ToolCallingRuntime};
pub use tools::{ToolCallTrace, ToolError, ToolExecutor, ToolObservation};
