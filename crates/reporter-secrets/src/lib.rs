//! Encrypted credential management for Market Reporter.
//!
//! Provides AES-256-GCM encryption of provider credentials, master key
//! resolution with an env/file/keychain fallback chain, and file-backed
//! stores for per-provider accounts and single-use OAuth login state.

pub mod cipher;
pub mod error;
pub mod master_key;
pub mod state;
pub mod store;
pub mod types;

pub use error::{Result, SecretError};
pub use master_key::MasterKeyProvider;
pub use state::{AuthStateStore, FileAuthStateStore, LoginState};
pub use store::{CredentialStore, FileCredentialStore};
pub use types::{AccountMeta, AccountType, CredentialSummary, EncryptedSecret, OAuthCredential};
