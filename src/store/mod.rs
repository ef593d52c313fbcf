//! IP set store backends
//!
//! The store owns the authoritative copy of every IP set and enforces
//! optimistic concurrency: each read hands out a lock token, and a write is
//! accepted only while that token is still current.

pub mod http_store;
pub mod memory_store;

pub use http_store::HttpIpSetStore;
pub use memory_store::{CallCounts, InMemoryIpSetStore};

use crate::models::{IpSetHandle, IpSetPage, IpSetSnapshot, Scope};
use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by an IP set store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("lock token is stale: {0}")]
    Conflict(String),

    #[error("IP set does not exist: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("request throttled: {0}")]
    Throttled(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("store returned {status} {code}: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether the same request could succeed if repeated later
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Conflict(_) | StoreError::Throttled(_) | StoreError::Http(_) => true,
            StoreError::Service { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Trait for IP set store backends
///
/// Every method is a single all-or-nothing remote call.
#[async_trait]
pub trait IpSetStore: Send + Sync {
    /// List one page of the IP sets in `scope`, starting at `marker`
    async fn list_ip_sets(
        &self,
        scope: Scope,
        marker: Option<&str>,
    ) -> Result<IpSetPage, StoreError>;

    /// Read an IP set's addresses and current lock token in one call
    async fn get_ip_set(&self, handle: &IpSetHandle) -> Result<IpSetSnapshot, StoreError>;

    /// Replace an IP set's addresses, conditional on `lock_token` being current
    ///
    /// Returns the lock token that is current after the write.
    async fn update_ip_set(
        &self,
        handle: &IpSetHandle,
        addresses: &[String],
        lock_token: &str,
    ) -> Result<String, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(StoreError::Conflict("x".into()).is_transient());
        assert!(StoreError::Throttled("x".into()).is_transient());
        assert!(!StoreError::AccessDenied("x".into()).is_transient());
        assert!(!StoreError::InvalidParameter("x".into()).is_transient());
        assert!(StoreError::Service {
            status: 503,
            code: "ServiceUnavailable".into(),
            message: String::new(),
        }
        .is_transient());
        assert!(!StoreError::Service {
            status: 400,
            code: "Bad".into(),
            message: String::new(),
        }
        .is_transient());
    }
}
