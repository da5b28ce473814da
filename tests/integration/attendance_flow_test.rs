//! End-to-end ingestion flows against a real database.
//!
//! The test upstream is unreachable, so synchronous delivery always fails
//! and accepted events land in the durable queue.

use http::StatusCode;

use crate::helpers::TestApp;

fn clock_body() -> serde_json::Value {
    serde_json::json!({
        "employee_id": "EMP-001",
        "timestamp": "2024-06-10T08:30:00Z",
        "kind": "clock-in",
        "device_id": "TAB-7",
    })
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set PUNCHGATE_TEST_DATABASE_URL)"]
async fn clock_with_unreachable_upstream_is_queued_with_zero_attempts() {
    let app = TestApp::new().await;
    let token = app.login("device-1").await;

    let response = app
        .request("POST", "/attendance/clock", Some(clock_body()), Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["queued"], true);
    assert_eq!(data["synced"], false);
    assert_eq!(data["duplicate"], false);

    let record_id = data["record_id"].as_str().unwrap();

    // The accepted event exists in the queue, pending, attempts untouched.
    let status = app
        .request(
            "GET",
            &format!("/attendance/status/{record_id}"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(status.status, StatusCode::OK);
    assert_eq!(status.body["data"]["state"], "pending");
    assert_eq!(status.body["data"]["attempts"], 0);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set PUNCHGATE_TEST_DATABASE_URL)"]
async fn replayed_event_produces_one_queue_entry() {
    let app = TestApp::new().await;
    let token = app.login("device-1").await;

    let first = app
        .request("POST", "/attendance/clock", Some(clock_body()), Some(&token))
        .await;
    let second = app
        .request("POST", "/attendance/clock", Some(clock_body()), Some(&token))
        .await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(
        first.body["data"]["record_id"],
        second.body["data"]["record_id"]
    );

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance_queue")
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set PUNCHGATE_TEST_DATABASE_URL)"]
async fn client_record_id_addresses_the_same_logical_event() {
    let app = TestApp::new().await;
    let token = app.login("device-1").await;

    let mut body = clock_body();
    body["client_record_id"] = serde_json::json!("device-1-seq-42");

    let response = app
        .request("POST", "/attendance/clock", Some(body), Some(&token))
        .await;
    assert_eq!(response.body["data"]["record_id"], "device-1-seq-42");
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set PUNCHGATE_TEST_DATABASE_URL)"]
async fn batch_offline_sync_queues_every_record() {
    let app = TestApp::new().await;
    let token = app.login("device-1").await;

    let body = serde_json::json!({
        "batch_id": "morning-shift",
        "offline_sync": true,
        "records": [
            {
                "employee_id": "EMP-001",
                "timestamp": "2024-06-10T08:30:00Z",
                "kind": "clock-in",
            },
            {
                "employee_id": "EMP-002",
                "timestamp": "2024-06-10T08:31:00Z",
                "kind": "clock-in",
            },
            {
                "employee_id": "EMP-003",
                "timestamp": "2024-06-10T08:32:00Z",
                "kind": "clock-in",
                "latitude": 200.0,
            },
        ],
    });

    let response = app
        .request("POST", "/attendance/batch", Some(body), Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let counts = &response.body["data"]["counts"];
    assert_eq!(counts["queued"], 2);
    assert_eq!(counts["error"], 1);

    let results = response.body["data"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[2]["status"], "error");

    // The batch is queryable by its tag.
    let batch = app
        .request("GET", "/sync/batch/morning-shift", None, Some(&token))
        .await;
    assert_eq!(batch.status, StatusCode::OK);
    assert_eq!(batch.body["data"]["counts"]["queued"], 2);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set PUNCHGATE_TEST_DATABASE_URL)"]
async fn drain_cycle_exhausts_attempts_and_retry_resets() {
    let app = TestApp::new().await;
    let token = app.login("device-1").await;

    app.request("POST", "/attendance/clock", Some(clock_body()), Some(&token))
        .await;

    // Each manual drain consumes one attempt against the dead upstream;
    // max_attempts defaults to 3.
    for _ in 0..3 {
        let drain = app.request("POST", "/sync/trigger", None, Some(&token)).await;
        assert_eq!(drain.status, StatusCode::OK);
    }

    let state: (String, i32) = sqlx::query_as(
        "SELECT state::text, attempts FROM attendance_queue WHERE employee_id = 'EMP-001'",
    )
    .fetch_one(&app.db_pool)
    .await
    .unwrap();
    assert_eq!(state.0, "failed_terminal");
    assert_eq!(state.1, 3);

    // Operator reset moves it back into the pipeline.
    let retry = app.request("POST", "/sync/retry", None, Some(&token)).await;
    assert_eq!(retry.status, StatusCode::OK);
    assert_eq!(retry.body["data"]["reset"], 1);
}
