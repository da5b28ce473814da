//! Workspace integration tests.
//!
//! Tests marked `#[ignore]` need a PostgreSQL instance; point
//! `PUNCHGATE_TEST_DATABASE_URL` at an empty database and run
//! `cargo test -- --ignored` to include them.

mod helpers;

mod attendance_flow_test;
mod auth_flow_test;
mod envelope_test;
