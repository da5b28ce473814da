//! Envelope and authentication-boundary tests that need no database.

use http::StatusCode;

use crate::helpers::TestApp;

#[tokio::test]
async fn missing_token_is_rejected_with_envelope() {
    let app = TestApp::detached();

    let response = app.request("GET", "/attendance/pending", None, None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["status"], "error");
    assert_eq!(response.body["error_code"], "UNAUTHORIZED");
    assert!(response.body["request_id"].is_string());
    assert!(response.body["timestamp"].is_string());
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let app = TestApp::detached();

    let response = app
        .request("GET", "/attendance/pending", None, Some("not-a-jwt"))
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["status"], "error");
}

#[tokio::test]
async fn wrong_device_key_is_rejected_before_touching_storage() {
    let app = TestApp::detached();

    let response = app
        .request(
            "POST",
            "/auth/login",
            Some(serde_json::json!({
                "subject_id": "device-1",
                "device_key": "wrong-key",
            })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error_code"], "AUTHENTICATION");
}

#[tokio::test]
async fn login_validation_errors_are_400() {
    let app = TestApp::detached();

    let response = app
        .request(
            "POST",
            "/auth/login",
            Some(serde_json::json!({
                "subject_id": "",
                "device_key": "integration-test-key",
            })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error_code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn health_endpoint_is_unauthenticated() {
    let app = TestApp::detached();

    let response = app.request("GET", "/health", None, None).await;

    // The detached pool cannot reach a database; the endpoint still answers.
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "success");
    assert_eq!(response.body["data"]["database"], "unreachable");
}
