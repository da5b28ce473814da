//! # punchgate-forwarder
//!
//! The background forwarder: drains the durable queue into the upstream ERP
//! in bounded batches on a timer, and exposes the manual control surface
//! (trigger, retry-failed, force-sync, config update, prune).

pub mod runner;

pub use runner::{DrainSummary, Forwarder, ForwarderState, ForwarderStatus, SyncConfigUpdate};
