//! End-to-end: OAuth login through the coordinator, credential resolution
//! through the encrypted store, then an analysis run through the
//! tool-calling runtime with the resolved token on the wire.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use market_reporter_integration_tests::{init_tracing, ScriptedProviderClient};
use reporter_core::{AuthMode, ProviderConfig, ProviderRegistry};
use reporter_providers::{
    ConnectionStatus, ProviderAuthCoordinator, ProviderModel, ReadinessStatus,
};
use reporter_runtime::{
    RuntimeRequest, ToolCallingRuntime, ToolError, ToolExecutor,
};
use reporter_secrets::{cipher, CredentialStore, FileAuthStateStore, FileCredentialStore};
use serde_json::{json, Value};
use tempfile::TempDir;

struct StubNewsExecutor;

#[async_trait]
impl ToolExecutor for StubNewsExecutor {
    async fn execute(&self, name: &str, _arguments: &Value) -> Result<Value, ToolError> {
        match name {
            "search_news" => Ok(json!({
                "headlines": ["Earnings beat", "Guidance raised", "Buyback", "Upgrade"],
            })),
            other => Err(ToolError::new(other, "unknown tool")),
        }
    }
}

fn finbot_config() -> ProviderConfig {
    ProviderConfig {
        provider_id: "finbot".to_string(),
        kind: "oauth_portal".to_string(),
        auth_mode: AuthMode::Oauth,
        base_url: Some("https://api.finbot.example.com".to_string()),
        models: vec!["fin-large".to_string()],
        enabled: true,
        requires_base_url: true,
        login_timeout_seconds: 600,
    }
}

struct Setup {
    coordinator: ProviderAuthCoordinator,
    credentials: Arc<FileCredentialStore>,
    client: Arc<ScriptedProviderClient>,
    _tmp: TempDir,
}

fn setup(completions: &[&str]) -> Setup {
    init_tracing();
    let tmp = TempDir::new().unwrap();

    let credentials = Arc::new(
        FileCredentialStore::new(tmp.path().join("credentials.json"), cipher::generate_key())
            .unwrap(),
    );
    let login_states =
        Arc::new(FileAuthStateStore::new(tmp.path().join("auth-state.json")).unwrap());
    let client = Arc::new(ScriptedProviderClient::new("finbot", completions));

    let coordinator = ProviderAuthCoordinator::new(
        ProviderRegistry::from_configs([finbot_config()]),
        credentials.clone(),
        login_states,
        "user-1",
    )
    .with_client(client.clone());

    Setup {
        coordinator,
        credentials,
        client,
        _tmp: tmp,
    }
}

#[tokio::test]
async fn full_login_then_analysis_flow() {
    let setup = setup(&[
        r#"{"action":"call_tool","tool":"search_news","arguments":{"query":"AAPL"}}"#,
        r#"{"action":"final","final":{"summary":"Solid quarter","sentiment":"bullish","confidence":0.7}}"#,
    ]);

    // Not usable before login.
    let verdict = setup.coordinator.readiness("finbot").await.unwrap();
    assert_eq!(verdict.status, ReadinessStatus::LoginRequired);

    // Login round trip.
    let started = setup
        .coordinator
        .start_login("finbot", "https://app.example.com/callback", Some("/report"))
        .await
        .unwrap();
    assert!(started.auth_url.starts_with("https://login.example.com/"));

    let redirect = setup
        .coordinator
        .complete_login(
            "finbot",
            &started.state,
            Some("auth-code"),
            "https://app.example.com/callback",
            &HashMap::new(),
        )
        .await
        .unwrap();
    assert_eq!(redirect.as_deref(), Some("/report"));

    let verdict = setup.coordinator.readiness("finbot").await.unwrap();
    assert!(verdict.ready);
    assert_eq!(
        setup.coordinator.get_status("finbot").await.unwrap(),
        ConnectionStatus::Connected
    );

    // Resolve the credential only at invocation time.
    let credential = setup
        .credentials
        .get_oauth("finbot", "user-1")
        .await
        .unwrap()
        .unwrap();

    let model = ProviderModel::new(setup.client.clone(), "fin-large")
        .with_access_token(credential.access_token.clone());
    let runtime = ToolCallingRuntime::new(Arc::new(model), Arc::new(StubNewsExecutor));

    let outcome = runtime
        .run(&RuntimeRequest {
            task: "Assess AAPL going into earnings".to_string(),
            mode: "daily-report".to_string(),
            context: json!({"symbol": "AAPL"}),
            allowed_tools: vec!["search_news".to_string()],
        })
        .await;

    assert_eq!(outcome.draft.summary, "Solid quarter");
    assert_eq!(outcome.trace.len(), 1);
    assert_eq!(outcome.trace[0].tool, "search_news");

    // Four headlines came back; the trace preview is bounded to three.
    let preview = &outcome.trace[0].result_preview;
    assert_eq!(preview["headlines"].as_array().unwrap().len(), 3);
    assert_eq!(preview["headlines_count"], json!(4));

    // The resolved token rode along on every model call.
    let seen = setup.client.seen_tokens.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|t| t.as_deref() == Some("tok-access")));
}

#[tokio::test]
async fn logout_returns_the_provider_to_login_required() {
    let setup = setup(&[]);

    let started = setup
        .coordinator
        .start_login("finbot", "https://app.example.com/callback", None)
        .await
        .unwrap();
    setup
        .coordinator
        .complete_login(
            "finbot",
            &started.state,
            Some("auth-code"),
            "https://app.example.com/callback",
            &HashMap::new(),
        )
        .await
        .unwrap();

    assert!(setup.coordinator.logout("finbot").await.unwrap());
    assert!(setup
        .credentials
        .get_oauth("finbot", "user-1")
        .await
        .unwrap()
        .is_none());

    let verdict = setup.coordinator.readiness("finbot").await.unwrap();
    assert_eq!(verdict.status, ReadinessStatus::LoginRequired);
    assert_eq!(
        setup.coordinator.get_status("finbot").await.unwrap(),
        ConnectionStatus::Disconnected
    );
}

#[tokio::test]
async fn double_completion_has_exactly_one_winner() {
    let setup = setup(&[]);

    let started = setup
        .coordinator
        .start_login("finbot", "https://app.example.com/callback", None)
        .await
        .unwrap();

    let first = setup
        .coordinator
        .complete_login(
            "finbot",
            &started.state,
            Some("auth-code"),
            "https://app.example.com/callback",
            &HashMap::new(),
        )
        .await;
    let second = setup
        .coordinator
        .complete_login(
            "finbot",
            &started.state,
            Some("auth-code"),
            "https://app.example.com/callback",
            &HashMap::new(),
        )
        .await;

    assert!(first.is_ok());
    let err = second.unwrap_err();
    assert_eq!(err.to_string(), "Authentication error: invalid or expired login state");
}
