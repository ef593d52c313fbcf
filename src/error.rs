//! Invocation-level error taxonomy
//!
//! Every failure aborts the current invocation. Callers decide whether to
//! redeliver based on [`BlockError::is_retryable`]; nothing is retried here.

use crate::config::ConfigError;
use crate::models::Scope;
use crate::store::StoreError;
use thiserror::Error;

/// Coarse classification of a [`BlockError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    InvalidEvent,
    NotFound,
    ConcurrencyConflict,
    StoreFault,
}

#[derive(Error, Debug)]
pub enum BlockError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Event is not valid JSON: {0}")]
    InvalidEvent(#[source] serde_json::Error),

    #[error("IP set '{name}' not found in scope '{scope}'")]
    NotFound { name: String, scope: Scope },

    #[error("IP set '{name}' was modified concurrently: {message}")]
    ConcurrencyConflict { name: String, message: String },

    #[error("IP set store error: {0}")]
    Store(#[source] StoreError),
}

impl BlockError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BlockError::Configuration(_) => ErrorKind::Configuration,
            BlockError::InvalidEvent(_) => ErrorKind::InvalidEvent,
            BlockError::NotFound { .. } => ErrorKind::NotFound,
            BlockError::ConcurrencyConflict { .. } => ErrorKind::ConcurrencyConflict,
            BlockError::Store(_) => ErrorKind::StoreFault,
        }
    }

    /// Whether redelivering the event could succeed
    ///
    /// A conflict is retryable because redelivery starts over from a fresh
    /// read. Configuration mismatches never heal on their own.
    pub fn is_retryable(&self) -> bool {
        match self {
            BlockError::ConcurrencyConflict { .. } => true,
            BlockError::Store(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Classify a store error raised while working on the set `name`
    pub(crate) fn from_store(err: StoreError, name: &str, scope: Scope) -> Self {
        match err {
            StoreError::Conflict(message) => BlockError::ConcurrencyConflict {
                name: name.to_string(),
                message,
            },
            StoreError::NotFound(_) => BlockError::NotFound {
                name: name.to_string(),
                scope,
            },
            other => BlockError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_and_retry_policy() {
        let config = BlockError::from(ConfigError::Missing("IP_SET_NAME"));
        assert_eq!(config.kind(), ErrorKind::Configuration);
        assert!(!config.is_retryable());

        let missing = BlockError::from_store(StoreError::NotFound("id".into()), "blocked", Scope::Regional);
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        assert!(!missing.is_retryable());

        let conflict =
            BlockError::from_store(StoreError::Conflict("stale".into()), "blocked", Scope::Regional);
        assert_eq!(conflict.kind(), ErrorKind::ConcurrencyConflict);
        assert!(conflict.is_retryable());

        let throttled =
            BlockError::from_store(StoreError::Throttled("slow down".into()), "blocked", Scope::Regional);
        assert_eq!(throttled.kind(), ErrorKind::StoreFault);
        assert!(throttled.is_retryable());

        let denied =
            BlockError::from_store(StoreError::AccessDenied("no".into()), "blocked", Scope::Regional);
        assert_eq!(denied.kind(), ErrorKind::StoreFault);
        assert!(!denied.is_retryable());
    }

    #[test]
    fn test_messages() {
        let err = BlockError::NotFound {
            name: "blocked".to_string(),
            scope: Scope::Cloudfront,
        };
        assert_eq!(err.to_string(), "IP set 'blocked' not found in scope 'CLOUDFRONT'");
    }
}
