//! Session lifecycle tests against a real database.

use http::StatusCode;

use crate::helpers::TestApp;

#[tokio::test]
#[ignore = "requires PostgreSQL (set PUNCHGATE_TEST_DATABASE_URL)"]
async fn session_cap_terminates_the_oldest_session() {
    // Test config caps subjects at 2 concurrent sessions.
    let app = TestApp::new().await;

    let oldest = app.login("device-capped").await;
    let second = app.login("device-capped").await;
    let third = app.login("device-capped").await;

    // The two newest sessions remain usable.
    for token in [&second, &third] {
        let response = app.request("GET", "/auth/verify", None, Some(token)).await;
        assert_eq!(response.status, StatusCode::OK);
    }

    // list() reports exactly the cap.
    let verify = app.request("GET", "/auth/verify", None, Some(&third)).await;
    assert_eq!(
        verify.body["data"]["sessions"].as_array().unwrap().len(),
        2
    );

    // The displaced session's token fails with session_inactive.
    let displaced = app
        .request("GET", "/attendance/pending", None, Some(&oldest))
        .await;
    assert_eq!(displaced.status, StatusCode::UNAUTHORIZED);
    assert_eq!(displaced.body["error_code"], "SESSION_INACTIVE");

    let reason: String = sqlx::query_scalar(
        "SELECT termination_reason::text FROM device_sessions \
         WHERE termination_reason IS NOT NULL",
    )
    .fetch_one(&app.db_pool)
    .await
    .unwrap();
    assert_eq!(reason, "concurrent_limit_exceeded");
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set PUNCHGATE_TEST_DATABASE_URL)"]
async fn logout_revokes_the_session() {
    let app = TestApp::new().await;
    let token = app.login("device-logout").await;

    let logout = app.request("POST", "/auth/logout", None, Some(&token)).await;
    assert_eq!(logout.status, StatusCode::OK);

    let after = app.request("GET", "/auth/verify", None, Some(&token)).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert_eq!(after.body["error_code"], "SESSION_INACTIVE");
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set PUNCHGATE_TEST_DATABASE_URL)"]
async fn refresh_mints_a_working_access_token() {
    let app = TestApp::new().await;

    let login = app
        .request(
            "POST",
            "/auth/login",
            Some(serde_json::json!({
                "subject_id": "device-refresh",
                "device_key": "integration-test-key",
            })),
            None,
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    let refresh_token = login.body["data"]["refresh_token"].as_str().unwrap();

    let refreshed = app
        .request(
            "POST",
            "/auth/refresh",
            Some(serde_json::json!({ "refresh_token": refresh_token })),
            None,
        )
        .await;
    assert_eq!(refreshed.status, StatusCode::OK);

    let new_access = refreshed.body["data"]["access_token"].as_str().unwrap();
    let verify = app
        .request("GET", "/auth/verify", None, Some(new_access))
        .await;
    assert_eq!(verify.status, StatusCode::OK);

    // An access token is not accepted where a refresh token is required.
    let misuse = app
        .request(
            "POST",
            "/auth/refresh",
            Some(serde_json::json!({ "refresh_token": new_access })),
            None,
        )
        .await;
    assert_eq!(misuse.status, StatusCode::UNAUTHORIZED);
}
