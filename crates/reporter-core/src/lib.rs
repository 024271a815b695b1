//! # reporter-core
//!
//! Core types and utilities shared across the Market Reporter crates:
//!
//! - **Types**: provider configuration and the per-session provider registry
//! - **Utilities**: path resolution, token generation, secure string handling

pub mod error;
pub mod id;
pub mod paths;
pub mod secret;
pub mod types;

// Re-exports for convenience
pub use error::{Error, Result};
pub use secret::SecretString;
pub use types::*;
