//! Contract tests for registration key activation.
//!
//! | Method | Path | Test |
//! |--------|------|------|
//! | POST   | `mgmt/cm/device/licensing/pool/initial-activation` | `start_*` |
//! | GET    | `.../initial-activation/{regKey}` | `poll_*`, `wait_*` |
//! | PATCH  | `.../initial-activation/{regKey}` | `eula_*` |
//! | DELETE | `.../initial-activation/{regKey}` | `remove_*` |

use std::time::Duration;

use bigiq_client::activation::ActivationStatus;
use bigiq_client::{BigIqClient, BigIqConfig, BigIqError, RegKey};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ACTIVATIONS: &str = "/mgmt/cm/device/licensing/pool/initial-activation";
const KEY1: &str = "/mgmt/cm/device/licensing/pool/initial-activation/KEY1";
const EULA: &str = "END USER LICENSE AGREEMENT\n<Licensee> & <F5> agree...";

fn test_client(mock_server: &MockServer) -> BigIqClient {
    BigIqClient::new(BigIqConfig::local_mock(&mock_server.uri()).unwrap()).unwrap()
}

fn task(status: &str) -> serde_json::Value {
    serde_json::json!({
        "regKey": "KEY1",
        "name": "lab-pool",
        "status": status,
        "kind": "cm:device:licensing:pool:initial-activation:initialactivationworkerstate"
    })
}

fn eula_task() -> serde_json::Value {
    serde_json::json!({
        "regKey": "KEY1",
        "name": "lab-pool",
        "status": "NEED_EULA_ACCEPT",
        "eulaText": EULA
    })
}

async fn mount_start(mock_server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(ACTIVATIONS))
        .and(body_json(serde_json::json!({
            "regKey": "KEY1",
            "name": "lab-pool",
            "status": "ACTIVATING_AUTOMATIC"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "regKey": "KEY1",
            "name": "lab-pool",
            "status": "ACTIVATING_AUTOMATIC",
            "message": "Activation started"
        })))
        .expect(1)
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn start_returns_server_message() {
    let mock_server = MockServer::start().await;
    mount_start(&mock_server).await;

    let client = test_client(&mock_server);
    let message = client
        .activations()
        .start(&RegKey::new("KEY1"), "lab-pool", ActivationStatus::ActivatingAutomatic)
        .await
        .unwrap();
    assert_eq!(message, "Activation started");
}

#[tokio::test]
async fn start_rejection_carries_server_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ACTIVATIONS))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "code": 400,
            "message": "Registration key KEY1 is already activated",
            "errorStack": []
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client
        .activations()
        .start(&RegKey::new("KEY1"), "lab-pool", ActivationStatus::ActivatingAutomatic)
        .await
        .unwrap_err();
    assert_eq!(
        err.server_message().as_deref(),
        Some("Registration key KEY1 is already activated")
    );
}

#[tokio::test]
async fn poll_without_status_is_protocol_violation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(KEY1))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "regKey": "KEY1",
            "name": "lab-pool"
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client.activations().poll(&RegKey::new("KEY1")).await.unwrap_err();
    match err {
        BigIqError::ProtocolViolation { detail, .. } => {
            assert_eq!(detail, "license status not available")
        }
        other => panic!("expected ProtocolViolation, got {other:?}"),
    }
}

#[tokio::test]
async fn poll_with_unknown_status_is_protocol_violation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(KEY1))
        .respond_with(ResponseTemplate::new(200).set_body_json(task("LICENSING_MAYBE")))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client.activations().poll(&RegKey::new("KEY1")).await.unwrap_err();
    assert!(matches!(err, BigIqError::ProtocolViolation { .. }));
}

#[tokio::test]
async fn poll_of_missing_activation_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(KEY1))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "code": 404,
            "message": "Object not found",
            "errorStack": []
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client.activations().poll(&RegKey::new("KEY1")).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn eula_flow_start_poll_accept_complete() {
    let mock_server = MockServer::start().await;
    mount_start(&mock_server).await;

    // poll + the re-poll inside accept_eula
    Mock::given(method("GET"))
        .and(path(KEY1))
        .respond_with(ResponseTemplate::new(200).set_body_json(eula_task()))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path(KEY1))
        .and(body_json(serde_json::json!({
            "status": "ACTIVATING_AUTOMATIC_EULA_ACCEPTED",
            "eulaText": EULA
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(task("ACTIVATING_AUTOMATIC_EULA_ACCEPTED")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(KEY1))
        .respond_with(ResponseTemplate::new(200).set_body_json(task("LICENSING_COMPLETE")))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let activations = client.activations();
    let key = RegKey::new("KEY1");

    activations
        .start(&key, "lab-pool", ActivationStatus::ActivatingAutomatic)
        .await
        .unwrap();

    let polled = activations.poll(&key).await.unwrap();
    assert_eq!(polled.status, ActivationStatus::NeedEulaAccept);
    assert_eq!(polled.eula_text.as_deref(), Some(EULA));

    activations.accept_eula(&key).await.unwrap();

    let done = activations.poll(&key).await.unwrap();
    assert_eq!(done.status, ActivationStatus::LicensingComplete);
}

#[tokio::test]
async fn eula_accept_without_text_is_protocol_violation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(KEY1))
        .respond_with(ResponseTemplate::new(200).set_body_json(task("NEED_EULA_ACCEPT")))
        .mount(&mock_server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client
        .activations()
        .accept_eula(&RegKey::new("KEY1"))
        .await
        .unwrap_err();
    assert!(matches!(err, BigIqError::ProtocolViolation { .. }));
}

#[tokio::test]
async fn activate_runs_the_whole_workflow() {
    let mock_server = MockServer::start().await;
    mount_start(&mock_server).await;

    Mock::given(method("GET"))
        .and(path(KEY1))
        .respond_with(ResponseTemplate::new(200).set_body_json(task("ACTIVATING_AUTOMATIC")))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    // wait stops here, then accept_eula re-reads it
    Mock::given(method("GET"))
        .and(path(KEY1))
        .respond_with(ResponseTemplate::new(200).set_body_json(eula_task()))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(KEY1))
        .respond_with(ResponseTemplate::new(200).set_body_json(task("ACTIVATING_AUTOMATIC_EULA_ACCEPTED")))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(KEY1))
        .respond_with(ResponseTemplate::new(200).set_body_json(task("ACTIVATING_AUTOMATIC_EULA_ACCEPTED")))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(KEY1))
        .respond_with(ResponseTemplate::new(200).set_body_json(task("LICENSING_COMPLETE")))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let done = client
        .activations()
        .activate(
            &RegKey::new("KEY1"),
            "lab-pool",
            ActivationStatus::ActivatingAutomatic,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(done.status, ActivationStatus::LicensingComplete);
}

#[tokio::test]
async fn wait_on_failed_activation_is_terminal_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(KEY1))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "regKey": "KEY1",
            "name": "lab-pool",
            "status": "LICENSING_FAILED",
            "message": "Unable to reach the license server"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client
        .activations()
        .wait(&RegKey::new("KEY1"), &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        BigIqError::TerminalFailure { status, message, .. } => {
            assert_eq!(status, "LICENSING_FAILED");
            assert_eq!(message, "Unable to reach the license server");
        }
        other => panic!("expected TerminalFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn wait_can_be_cancelled() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(KEY1))
        .respond_with(ResponseTemplate::new(200).set_body_json(task("LICENSING_ACTIVATION_IN_PROGRESS")))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = client
        .activations()
        .wait(&RegKey::new("KEY1"), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, BigIqError::Cancelled { .. }), "got {err:?}");
}

#[tokio::test]
async fn remove_deletes_the_activation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(KEY1))
        .respond_with(ResponseTemplate::new(200).set_body_json(task("LICENSING_COMPLETE")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    client.activations().remove(&RegKey::new("KEY1")).await.unwrap();
}
