//! Database repositories.

pub mod queue;
pub mod session;

pub use queue::QueueRepository;
pub use session::SessionRepository;
