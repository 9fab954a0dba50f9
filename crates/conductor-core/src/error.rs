use thiserror::Error;

/// Top-level error type for the conductor workspace.
///
/// Subsystem crates define their own error enums and wrap this one (via
/// `#[from]`) so that the `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConductorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Shutdown in progress")]
    ShuttingDown,
}

impl From<toml::de::Error> for ConductorError {
    fn from(err: toml::de::Error) -> Self {
        ConductorError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ConductorError {
    fn from(err: toml::ser::Error) -> Self {
        ConductorError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ConductorError {
    fn from(err: serde_json::Error) -> Self {
        ConductorError::Serialization(err.to_string())
    }
}

impl ConductorError {
    /// Build a storage error for a poisoned lock guarding `what`.
    pub fn lock_poisoned(what: &str) -> Self {
        ConductorError::Storage(format!("Lock poisoned: {}", what))
    }
}

/// A specialized `Result` type for conductor operations.
pub type Result<T> = std::result::Result<T, ConductorError>;
