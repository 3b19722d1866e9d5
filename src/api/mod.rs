//! API Module
//!
//! HTTP handlers and routing for the cache server REST API. One cache policy,
//! chosen by configuration, is served per process.

pub mod handlers;
pub mod routes;
pub mod state;

pub use handlers::*;
pub use routes::create_router;
pub use state::PolicyCache;
