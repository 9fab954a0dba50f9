//! Shared building blocks for the conductor workspace: the top-level error
//! type, TOML configuration, and common value types.

pub mod config;
pub mod error;
pub mod types;

pub use config::ConductorConfig;
pub use error::{ConductorError, Result};
pub use types::*;
