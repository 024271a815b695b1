//! Master key resolution across restarts, wired through the credential
//! store the way a deployment uses it.

use market_reporter_integration_tests::init_tracing;
use reporter_secrets::{CredentialStore, FileCredentialStore, MasterKeyProvider};
use tempfile::TempDir;

#[tokio::test]
async fn secrets_survive_a_restart_via_the_key_file() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let store_path = tmp.path().join("credentials.json");

    // First boot: no key anywhere, one is generated and persisted.
    let key_provider = MasterKeyProvider::beside_store(&store_path)
        .with_env_var("MR_IT_KEY_UNSET_1")
        .without_keychain();
    let key = key_provider.get_or_create().unwrap();
    assert!(tmp.path().join("master.key").exists());

    let store = FileCredentialStore::new(store_path.clone(), key).unwrap();
    store.put_api_key("openai", "user-1", "sk-live-123").await.unwrap();
    drop(store);

    // Second boot: the key file is the surviving backend.
    let key_provider = MasterKeyProvider::beside_store(&store_path)
        .with_env_var("MR_IT_KEY_UNSET_1")
        .without_keychain();
    let key = key_provider.get_or_create().unwrap();

    let store = FileCredentialStore::new(store_path, key).unwrap();
    let resolved = store.get_api_key("openai", "user-1").await.unwrap().unwrap();
    assert_eq!(resolved.expose(), "sk-live-123");
}

#[tokio::test]
async fn key_from_environment_seeds_the_file_backend() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let store_path = tmp.path().join("credentials.json");
    let env_var = "MR_IT_KEY_SEEDED_1";

    // Deployment pins the key via the environment.
    let pinned = reporter_secrets::cipher::generate_key();
    std::env::set_var(env_var, {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&pinned)
    });

    let key_provider = MasterKeyProvider::beside_store(&store_path)
        .with_env_var(env_var)
        .without_keychain();
    let key = key_provider.get_or_create().unwrap();
    assert_eq!(key, pinned);

    let store = FileCredentialStore::new(store_path.clone(), key).unwrap();
    store.put_api_key("openai", "user-1", "sk-pinned").await.unwrap();
    drop(store);

    // Environment cleared; the opportunistically written file takes over.
    std::env::remove_var(env_var);
    let key = key_provider.get_or_create().unwrap();
    assert_eq!(key, pinned);

    let store = FileCredentialStore::new(store_path, key).unwrap();
    let resolved = store.get_api_key("openai", "user-1").await.unwrap().unwrap();
    assert_eq!(resolved.expose(), "sk-pinned");
}
