//! Master key resolution and persistence.
//!
//! The single 256-bit key protecting all stored secrets is resolved in
//! priority order:
//!
//! 1. `MARKET_REPORTER_MASTER_KEY` environment variable (base64)
//! 2. Local key file (base64 text, mode 0600 where supported)
//! 3. OS keychain entry (service `market-reporter`, account `master-key`)
//! 4. Generate a new key and persist it to the keychain and the key file
//!
//! On first creation the key is written to every backend that accepts it,
//! so later reads survive any single backend going away. A key that fails
//! to decode to exactly 32 bytes is an error naming its source, never a
//! trigger to regenerate: a fresh key would make every previously stored
//! secret unrecoverable.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{debug, warn};

use crate::cipher::{self, KEY_SIZE};
use crate::error::{Result, SecretError};

const SERVICE_NAME: &str = "market-reporter";
const ACCOUNT_NAME: &str = "master-key";

/// Default environment variable holding a base64-encoded master key.
pub const DEFAULT_ENV_VAR: &str = "MARKET_REPORTER_MASTER_KEY";

/// Resolves or creates the master key used by the credential store.
pub struct MasterKeyProvider {
    env_var: String,
    file_path: PathBuf,
    use_keychain: bool,
}

impl MasterKeyProvider {
    /// Create a provider with an explicit key file path.
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            env_var: DEFAULT_ENV_VAR.to_string(),
            file_path: file_path.into(),
            use_keychain: true,
        }
    }

    /// Create a provider whose key file sits next to a file-based data
    /// store, so the key travels with the data it protects.
    pub fn beside_store(store_path: &Path) -> Self {
        Self::new(reporter_core::paths::master_key_file_beside(store_path))
    }

    /// Create a provider using the default key file location
    /// (`~/.market-reporter/master.key`).
    pub fn from_default_dir() -> Result<Self> {
        let path = reporter_core::paths::master_key_file()
            .map_err(|e| SecretError::KeyStorage(e.to_string()))?;
        Ok(Self::new(path))
    }

    /// Override the environment variable consulted first.
    pub fn with_env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var = name.into();
        self
    }

    /// Disable the OS keychain backend (headless deployments, tests).
    pub fn without_keychain(mut self) -> Self {
        self.use_keychain = false;
        self
    }

    /// The key file path this provider reads and writes.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Resolve the master key, creating and persisting one if none exists.
    pub fn get_or_create(&self) -> Result<Vec<u8>> {
        // 1. Environment variable.
        if let Ok(encoded) = std::env::var(&self.env_var) {
            let key = decode_key(&encoded, &self.env_var)?;
            debug!(source = %self.env_var, "using master key from environment");
            self.try_write_file(&key);
            return Ok(key);
        }

        // 2. Key file.
        if let Some(key) = self.read_file_key()? {
            debug!(path = %self.file_path.display(), "using master key from file");
            return Ok(key);
        }

        // 3. OS keychain.
        if self.use_keychain {
            if let Some(key) = self.read_keychain()? {
                debug!("using master key from OS keychain");
                self.try_write_file(&key);
                return Ok(key);
            }
        }

        // 4. Generate and persist to every backend that will take it.
        let key = cipher::generate_key();
        let mut failures = Vec::new();
        let mut persisted = false;

        if self.use_keychain {
            match self.write_keychain(&key) {
                Ok(()) => persisted = true,
                Err(reason) => failures.push(format!("keychain: {reason}")),
            }
        } else {
            failures.push("keychain: disabled".to_string());
        }

        match self.write_file_key(&key) {
            Ok(()) => persisted = true,
            Err(e) => failures.push(format!("key file {}: {e}", self.file_path.display())),
        }

        if persisted {
            debug!("generated and persisted a new master key");
            Ok(key)
        } else {
            Err(SecretError::KeyStorage(format!(
                "could not persist a new master key: {}",
                failures.join("; ")
            )))
        }
    }

    /// Best-effort removal of the key from the file and keychain backends.
    ///
    /// Secrets encrypted under the removed key become unrecoverable; this
    /// exists for operator-driven reset flows.
    pub fn delete(&self) -> Result<()> {
        match std::fs::remove_file(&self.file_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(SecretError::Io(e)),
        }

        if self.use_keychain {
            if let Ok(entry) = keyring::Entry::new(SERVICE_NAME, ACCOUNT_NAME) {
                match entry.delete_password() {
                    Ok(()) | Err(keyring::Error::NoEntry) => {}
                    Err(e) => warn!("keychain delete failed: {e}"),
                }
            }
        }

        Ok(())
    }

    fn read_file_key(&self) -> Result<Option<Vec<u8>>> {
        let data = match std::fs::read_to_string(&self.file_path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SecretError::Io(e)),
        };
        decode_key(&data, &self.file_path.display().to_string()).map(Some)
    }

    fn write_file_key(&self, key: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.file_path, BASE64.encode(key))?;

        // Owner-only permissions where the platform supports them; failure
        // to harden is not failure to store.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            if let Err(e) = std::fs::set_permissions(&self.file_path, perms) {
                warn!(path = %self.file_path.display(), "could not restrict key file permissions: {e}");
            }
        }

        Ok(())
    }

    // Whole-value overwrite keeps the file in step with the authoritative
    // source; readers never observe a partially written key.
    fn try_write_file(&self, key: &[u8]) {
        if let Err(e) = self.write_file_key(key) {
            warn!(path = %self.file_path.display(), "opportunistic key file write failed: {e}");
        }
    }

    fn read_keychain(&self) -> Result<Option<Vec<u8>>> {
        let entry = match keyring::Entry::new(SERVICE_NAME, ACCOUNT_NAME) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("keychain unavailable: {e}");
                return Ok(None);
            }
        };

        match entry.get_password() {
            Ok(encoded) => decode_key(&encoded, "OS keychain").map(Some),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => {
                warn!("keychain read failed: {e}");
                Ok(None)
            }
        }
    }

    fn write_keychain(&self, key: &[u8]) -> std::result::Result<(), String> {
        let entry =
            keyring::Entry::new(SERVICE_NAME, ACCOUNT_NAME).map_err(|e| e.to_string())?;
        entry
            .set_password(&BASE64.encode(key))
            .map_err(|e| e.to_string())
    }
}

/// Decode and validate a base64 master key, naming its origin on failure.
fn decode_key(encoded: &str, origin: &str) -> Result<Vec<u8>> {
    let key = BASE64.decode(encoded.trim()).map_err(|_| SecretError::InvalidKey {
        origin: origin.to_string(),
        reason: "not valid base64".to_string(),
    })?;
    if key.len() != KEY_SIZE {
        return Err(SecretError::InvalidKey {
            origin: origin.to_string(),
            reason: format!("decoded to {} bytes, expected {KEY_SIZE}", key.len()),
        });
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn provider_in(dir: &TempDir, env_var: &str) -> MasterKeyProvider {
        MasterKeyProvider::new(dir.path().join("master.key"))
            .with_env_var(env_var)
            .without_keychain()
    }

    #[test]
    fn test_generates_once_then_reads_back() {
        let dir = TempDir::new().unwrap();
        let provider = provider_in(&dir, "MR_TEST_KEY_ABSENT_1");

        let first = provider.get_or_create().unwrap();
        assert_eq!(first.len(), KEY_SIZE);
        assert!(provider.file_path().exists());

        let second = provider.get_or_create().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_env_var_takes_priority_and_seeds_file() {
        let dir = TempDir::new().unwrap();
        let env_var = "MR_TEST_KEY_PRIORITY_1";
        let key = cipher::generate_key();
        std::env::set_var(env_var, BASE64.encode(&key));

        let provider = provider_in(&dir, env_var);
        let resolved = provider.get_or_create().unwrap();
        assert_eq!(resolved, key);
        // Opportunistic write so later runs survive a cleared environment.
        assert!(provider.file_path().exists());

        std::env::remove_var(env_var);
        let from_file = provider.get_or_create().unwrap();
        assert_eq!(from_file, key);
    }

    #[test]
    fn test_env_var_wrong_length_is_rejected() {
        let dir = TempDir::new().unwrap();
        let env_var = "MR_TEST_KEY_SHORT_1";
        std::env::set_var(env_var, BASE64.encode([0u8; 16]));

        let provider = provider_in(&dir, env_var);
        let result = provider.get_or_create();
        assert!(matches!(result, Err(SecretError::InvalidKey { .. })));

        std::env::remove_var(env_var);
    }

    #[test]
    fn test_env_var_bad_base64_is_rejected() {
        let dir = TempDir::new().unwrap();
        let env_var = "MR_TEST_KEY_GARBAGE_1";
        std::env::set_var(env_var, "!!not-base64!!");

        let provider = provider_in(&dir, env_var);
        let result = provider.get_or_create();
        assert!(matches!(result, Err(SecretError::InvalidKey { .. })));

        std::env::remove_var(env_var);
    }

    #[test]
    fn test_corrupted_key_file_is_an_error_not_a_regenerate() {
        let dir = TempDir::new().unwrap();
        let provider = provider_in(&dir, "MR_TEST_KEY_ABSENT_2");
        std::fs::write(provider.file_path(), "corrupted contents").unwrap();

        let result = provider.get_or_create();
        assert!(matches!(result, Err(SecretError::InvalidKey { .. })));
        // The corrupted file must survive for operator inspection.
        assert!(provider.file_path().exists());
    }

    #[test]
    fn test_delete_removes_file_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let provider = provider_in(&dir, "MR_TEST_KEY_ABSENT_3");

        provider.get_or_create().unwrap();
        assert!(provider.file_path().exists());

        provider.delete().unwrap();
        assert!(!provider.file_path().exists());
        provider.delete().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let provider = provider_in(&dir, "MR_TEST_KEY_ABSENT_4");
        provider.get_or_create().unwrap();

        let mode = std::fs::metadata(provider.file_path())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
