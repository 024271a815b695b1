//! Provider authentication and invocation for Market Reporter.
//!
//! This crate turns provider configuration plus stored credential state
//! into two things the analysis backend needs:
//!
//! - a readiness verdict ("is this provider usable right now"), and
//! - a model handle carrying a resolved credential for the runtime.
//!
//! # Example
//!
//! ```rust,ignore
//! use reporter_providers::{ProviderAuthCoordinator, HttpProviderClient};
//!
//! let coordinator = ProviderAuthCoordinator::new(registry, credentials, login_states, owner)
//!     .with_client(Arc::new(HttpProviderClient::new("finbot", base_url)?));
//!
//! let verdict = coordinator.readiness("finbot").await?;
//! if !verdict.ready {
//!     let started = coordinator.start_login("finbot", callback_url, None).await?;
//!     // send the user to started.auth_url ...
//! }
//! ```

pub mod client;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod readiness;

pub use client::{
    AuthStatusCheck, HttpProviderClient, LoginCompletion, LoginStart, ProviderClient,
};
pub use coordinator::{ConnectionStatus, ProviderAuthCoordinator, StartedLogin};
pub use error::{AuthError, Result};
pub use model::ProviderModel;
pub use readiness::{evaluate, Readiness, ReadinessInput, ReadinessStatus};
