//! # DomainError
//!
//! Centralized error handling for the matchmaking core.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all domain and service operations.
///
/// Cache and notifier failures never appear here: they are absorbed by the
/// services layer (see [`crate::ports::CacheError`] and
/// [`crate::ports::NotifyError`]).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Caller supplied something the operation can never accept
    /// (self-swipe, unknown identity, empty or oversized message).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The entity exists but its lifecycle forbids the operation
    /// (e.g. writing to an unmatched conversation).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Resource not found (e.g., Match, ChatMessage)
    #[error("{0} not found with ID {1}")]
    NotFound(&'static str, String),

    /// Source-of-record failure. Transient; the caller should retry.
    #[error("storage unavailable: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound(kind, id.to_string())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

/// A specialized Result type for matchmaking logic.
pub type DomainResult<T> = std::result::Result<T, DomainError>;
