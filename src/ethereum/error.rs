//! Error types for event fetching

use thiserror::Error;

/// Errors that can occur while fetching and extracting contract events.
///
/// None of these are recovered locally; they all surface to the process
/// boundary.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Node unreachable, URL unusable, or node not answering
    #[error("connection error: {0}")]
    Connection(String),

    /// Interface description missing or unparsable
    #[error("failed to load contract interface: {0}")]
    InterfaceLoad(String),

    /// Contract address is not 0x + 40 hex characters
    #[error("invalid contract address: {0}")]
    InvalidAddress(String),

    /// Log query rejected or result unusable
    #[error("event query failed: {0}")]
    Query(String),

    /// Fetched record does not match the declared interface
    #[error("schema mismatch: {0}")]
    Schema(String),
}

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;
