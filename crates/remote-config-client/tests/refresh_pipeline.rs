// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! End-to-end checks of a poller driving configuration and key fetches.

use std::time::Duration;

use httptest::matchers::{all_of, contains, request};
use httptest::{responders::status_code, Expectation, Server};
use remote_config_client::{
    AsyncPoller, ClientEnv, Config, ConfigApiClient, FetchError, PollerState,
};
use serde_json::json;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::timeout;

type TickOutcome = Result<(Config, String), FetchError>;

fn client_for(server: &Server) -> ConfigApiClient {
    let base_url = server.url_str("").trim_end_matches('/').to_string();
    let settings = ClientEnv::from_env_iter([
        ("RC_BASE_URL", base_url.as_str()),
        ("RC_APP_ID", "e2e-app"),
        ("RC_SUBSCRIPTION_KEY", "e2e-key"),
        ("RC_DEVICE_MODEL", "test-rig"),
        ("RC_ALLOW_PLAINTEXT", "true"),
    ])
    .to_settings()
    .expect("settings should build");
    ConfigApiClient::new(settings).expect("client should build")
}

/// Starts a poller whose action fetches the configuration, then its key.
fn start_pipeline(client: ConfigApiClient) -> (AsyncPoller, mpsc::UnboundedReceiver<TickOutcome>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let runtime = Handle::current();
    let poller = AsyncPoller::new(60, runtime.clone());
    poller.start(move || {
        let client = client.clone();
        let tx = tx.clone();
        runtime.spawn(async move {
            let outcome = match client.fetch_config().await {
                Ok(config) => client
                    .fetch_public_key(&config.key_id)
                    .await
                    .map(|key| (config, key)),
                Err(err) => Err(err),
            };
            let _ = tx.send(outcome);
        });
    });
    (poller, rx)
}

async fn next_outcome(rx: &mut mpsc::UnboundedReceiver<TickOutcome>) -> TickOutcome {
    timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("first tick should complete")
        .expect("channel should stay open")
}

#[tokio::test]
async fn first_tick_fetches_config_and_signing_key() {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/app/e2e-app/config"),
            request::headers(contains(("apikey", "ras-e2e-key"))),
            request::headers(contains(("ras-device-model", "test-rig"))),
            request::headers(contains(("ras-os-version", "unknown"))),
        ])
        .respond_with(
            status_code(200)
                .append_header("Signature", "sig-value")
                .body(json!({"body": {"theme": "dark"}, "keyId": "key-42"}).to_string()),
        ),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/keys/key-42"),
            request::headers(contains(("apikey", "ras-e2e-key"))),
        ])
        .respond_with(
            status_code(200).body(
                json!({
                    "id": "key-42",
                    "key": "MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAE",
                    "createdAt": "2019-07-23T07:24:57+00:00",
                    "algorithm": "ecdsa"
                })
                .to_string(),
            ),
        ),
    );

    let (poller, mut rx) = start_pipeline(client_for(&server));
    let (config, key) = next_outcome(&mut rx).await.expect("tick should succeed");

    assert_eq!(poller.state(), PollerState::Running);
    assert_eq!(config.get("theme"), Some("dark"));
    assert_eq!(config.signature.as_deref(), Some("sig-value"));
    assert_eq!(key, "MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAE");
}

#[tokio::test]
async fn failed_tick_is_reported_once_and_poller_keeps_running() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/app/e2e-app/config"))
            .respond_with(status_code(503)),
    );

    let (poller, mut rx) = start_pipeline(client_for(&server));
    let err = next_outcome(&mut rx).await.expect_err("503 should fail");

    assert!(matches!(err, FetchError::Status(503)));
    assert_eq!(poller.state(), PollerState::Running);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err(), "a tick delivers a single outcome");
}

#[tokio::test]
async fn invalid_key_document_fails_the_tick_with_validation_error() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/app/e2e-app/config")).respond_with(
            status_code(200).body(json!({"body": {}, "keyId": "broken"}).to_string()),
        ),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/keys/broken"))
            .respond_with(status_code(200).body(json!({"id": "broken", "key": "k"}).to_string())),
    );

    let (_poller, mut rx) = start_pipeline(client_for(&server));
    let err = next_outcome(&mut rx).await.expect_err("createdAt is missing");

    assert!(err.is_validation());
    assert!(!err.is_transport());
}
