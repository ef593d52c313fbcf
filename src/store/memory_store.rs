//! In-process implementation of the IpSetStore trait
//!
//! Honors the same contract as the remote store: every successful write
//! issues a fresh lock token, stale tokens are rejected, and addresses must
//! be valid CIDR blocks.

use super::{IpSetStore, StoreError};
use crate::models::{IpSetHandle, IpSetPage, IpSetSnapshot, IpSetSummary, Scope};
use async_trait::async_trait;
use ipnet::IpNet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Number of calls made to each store operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list: usize,
    pub get: usize,
    pub update: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.list + self.get + self.update
    }
}

#[derive(Debug)]
struct StoredIpSet {
    name: String,
    scope: Scope,
    id: String,
    addresses: Vec<String>,
    lock_token: String,
}

#[derive(Debug, Default)]
struct State {
    sets: Vec<StoredIpSet>,
    next_id: u64,
    next_token: u64,
    calls: CallCounts,
}

impl State {
    fn issue_token(&mut self) -> String {
        self.next_token += 1;
        format!("lock-{:012x}", self.next_token)
    }

    fn find_mut(&mut self, handle: &IpSetHandle) -> Option<&mut StoredIpSet> {
        self.sets
            .iter_mut()
            .find(|s| s.scope == handle.scope && s.id == handle.id && s.name == handle.name)
    }
}

/// Versioned IP sets held in memory
pub struct InMemoryIpSetStore {
    state: Mutex<State>,
    page_size: usize,
}

impl Default for InMemoryIpSetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIpSetStore {
    pub fn new() -> Self {
        Self::with_page_size(100)
    }

    /// Create a store whose listings return at most `page_size` sets per page
    pub fn with_page_size(page_size: usize) -> Self {
        InMemoryIpSetStore {
            state: Mutex::new(State::default()),
            page_size: page_size.max(1),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create an IP set and return its id
    pub fn create_ip_set(&self, name: &str, scope: Scope, addresses: &[&str]) -> String {
        let mut state = self.state();
        state.next_id += 1;
        let id = format!("ipset-{:08x}", state.next_id);
        let lock_token = state.issue_token();
        state.sets.push(StoredIpSet {
            name: name.to_string(),
            scope,
            id: id.clone(),
            addresses: addresses.iter().map(|a| a.to_string()).collect(),
            lock_token,
        });
        id
    }

    /// Delete an IP set, returning whether it existed
    pub fn delete_ip_set(&self, handle: &IpSetHandle) -> bool {
        let mut state = self.state();
        let before = state.sets.len();
        state
            .sets
            .retain(|s| !(s.scope == handle.scope && s.id == handle.id));
        state.sets.len() != before
    }

    /// Current addresses of a set, without counting as a call
    pub fn addresses(&self, handle: &IpSetHandle) -> Option<Vec<String>> {
        self.state().find_mut(handle).map(|s| s.addresses.clone())
    }

    /// Handle of the set named `name` in `scope`, without counting as a call
    pub fn handle(&self, name: &str, scope: Scope) -> Option<IpSetHandle> {
        self.state()
            .sets
            .iter()
            .find(|s| s.name == name && s.scope == scope)
            .map(|s| IpSetHandle {
                name: s.name.clone(),
                scope,
                id: s.id.clone(),
            })
    }

    pub fn call_counts(&self) -> CallCounts {
        self.state().calls
    }
}

#[async_trait]
impl IpSetStore for InMemoryIpSetStore {
    async fn list_ip_sets(
        &self,
        scope: Scope,
        marker: Option<&str>,
    ) -> Result<IpSetPage, StoreError> {
        let mut state = self.state();
        state.calls.list += 1;

        let start = match marker {
            Some(m) => m
                .parse::<usize>()
                .map_err(|_| StoreError::InvalidParameter(format!("bad marker: {}", m)))?,
            None => 0,
        };

        let in_scope: Vec<&StoredIpSet> = state.sets.iter().filter(|s| s.scope == scope).collect();
        let ip_sets = in_scope
            .iter()
            .skip(start)
            .take(self.page_size)
            .map(|s| IpSetSummary {
                name: s.name.clone(),
                id: s.id.clone(),
                description: None,
                arn: None,
            })
            .collect();

        let end = start.saturating_add(self.page_size);
        let next_marker = (end < in_scope.len()).then(|| end.to_string());

        Ok(IpSetPage {
            ip_sets,
            next_marker,
        })
    }

    async fn get_ip_set(&self, handle: &IpSetHandle) -> Result<IpSetSnapshot, StoreError> {
        let mut state = self.state();
        state.calls.get += 1;

        let set = state
            .find_mut(handle)
            .ok_or_else(|| StoreError::NotFound(handle.id.clone()))?;

        Ok(IpSetSnapshot {
            addresses: set.addresses.clone(),
            lock_token: set.lock_token.clone(),
        })
    }

    async fn update_ip_set(
        &self,
        handle: &IpSetHandle,
        addresses: &[String],
        lock_token: &str,
    ) -> Result<String, StoreError> {
        let mut state = self.state();
        state.calls.update += 1;

        if let Some(bad) = addresses.iter().find(|a| a.parse::<IpNet>().is_err()) {
            return Err(StoreError::InvalidParameter(format!(
                "address is not a valid CIDR block: {}",
                bad
            )));
        }

        let current = state
            .find_mut(handle)
            .ok_or_else(|| StoreError::NotFound(handle.id.clone()))?
            .lock_token
            .clone();

        if current != lock_token {
            return Err(StoreError::Conflict(format!(
                "lock token {} is no longer current for {}",
                lock_token, handle.id
            )));
        }

        let next = state.issue_token();
        if let Some(set) = state.find_mut(handle) {
            set.addresses = addresses.to_vec();
            set.lock_token = next.clone();
        }

        Ok(next)
    }
}
