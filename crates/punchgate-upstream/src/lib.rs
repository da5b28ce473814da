//! # punchgate-upstream
//!
//! Façade over the upstream ERP HTTP API. Centralizes concurrency capping,
//! rate budgeting, request spacing, and retry policy so every caller
//! (ingestion and the forwarder) shares one pacing budget.

pub mod client;
pub mod gate;
pub mod types;

pub use client::ErpClient;
pub use gate::DispatchGate;
pub use types::SubmitOutcome;
