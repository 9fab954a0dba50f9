//! HTTP surface of the Conductor action engine.
//!
//! Exposes batch execution, rollback, approval review and resumption,
//! executor registry management, and shift scheduling over axum.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
