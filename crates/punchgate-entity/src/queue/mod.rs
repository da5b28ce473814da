//! Durable queue entry model and states.

pub mod model;
pub mod state;

pub use model::{EnqueueOutcome, QueueEntry, QueueStats};
pub use state::QueueState;
