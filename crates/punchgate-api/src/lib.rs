//! # punchgate-api
//!
//! HTTP boundary of the Punchgate gateway: router, handlers, DTOs,
//! extractors, middleware, and the server bootstrap.

pub mod app;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
