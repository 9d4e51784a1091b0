//! Error types for Deck Core

use thiserror::Error;

/// Core error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid presentation ID: {0}")]
    InvalidPresentationId(String),

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Role cannot be assigned: {0}")]
    UnassignableRole(String),

    #[error("Identity store error: {0}")]
    Identity(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for Deck Core operations
pub type Result<T> = std::result::Result<T, Error>;
