//! Errors raised by the Creator Hub library code
//!
//! The service maps each kind onto an HTTP status: `InvalidInput` is a 400,
//! `NotFound` a 404 and `IllegalTransition` a 409. Everything else is a 500.

use std::fmt::Display;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Pool, pragma or query failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Storage bucket or root folder I/O
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unreadable or malformed TOML config
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing stored object
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected field: bad email, weak password, unknown enum text,
    /// out-of-range slot or invoice amounts
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Lifecycle move the record's current status does not allow
    #[error("{entity} cannot move from {from} to {to}")]
    IllegalTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// Password hashing backend failure
    #[error("Credential error: {0}")]
    Credentials(String),
}

impl Error {
    pub fn illegal_transition(entity: &'static str, from: impl Display, to: impl Display) -> Self {
        Error::IllegalTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}
