//! Error handling for table-finder

use std::fmt;
use thiserror::Error;

use table_finder_auth::AuthError;
use table_finder_postgrest::PostgrestError;

/// Unified error type
#[derive(Error, Debug)]
pub enum Error {
    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Guest table query errors
    #[error("Database error: {0}")]
    Database(#[from] PostgrestError),

    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure reported by a non-HTTP backend
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    pub fn backend<T: fmt::Display>(msg: T) -> Self {
        Error::Backend(msg.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
