//! Read-modify-write of a shared IP set
//!
//! One pass: resolve the set by name, read addresses and lock token together,
//! skip if the address is present, otherwise write the fetched list plus one
//! `/32` entry with the token from that same read. A stale token surfaces as
//! a conflict; the whole pass is rerun by redelivery, never the write alone.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::BlockError;
use crate::models::{BlockOutcome, IpSetHandle, Scope};
use crate::store::{IpSetStore, StoreError};

pub struct IpSetReconciler {
    store: Arc<dyn IpSetStore>,
}

impl IpSetReconciler {
    pub fn new(store: Arc<dyn IpSetStore>) -> Self {
        IpSetReconciler { store }
    }

    /// Ensure `address` is present in the IP set `ip_set_name`
    pub async fn reconcile(
        &self,
        ip_set_name: &str,
        scope: Scope,
        address: &str,
    ) -> Result<BlockOutcome, BlockError> {
        let handle = self.resolve(ip_set_name, scope).await?;

        let snapshot = self.store.get_ip_set(&handle).await.map_err(|e| {
            log::error!("Error getting IP set '{}' details: {}", ip_set_name, e);
            BlockError::from_store(e, ip_set_name, scope)
        })?;

        if snapshot.contains_host(address) {
            log::info!(
                "IP {} is already in the IP set '{}'. No update needed.",
                address,
                ip_set_name
            );
            return Ok(BlockOutcome::AlreadyBlocked);
        }

        let addresses = snapshot.with_host_added(address);

        self.store
            .update_ip_set(&handle, &addresses, &snapshot.lock_token)
            .await
            .map_err(|e| {
                log::error!("Error updating IP set '{}': {}", ip_set_name, e);
                BlockError::from_store(e, ip_set_name, scope)
            })?;

        log::info!("Successfully added IP {} to IP set '{}'", address, ip_set_name);
        Ok(BlockOutcome::Blocked)
    }

    /// Find the set named `ip_set_name` in `scope`, walking every listing page
    async fn resolve(&self, ip_set_name: &str, scope: Scope) -> Result<IpSetHandle, BlockError> {
        let mut marker: Option<String> = None;
        let mut seen_markers = HashSet::new();

        loop {
            let page = self
                .store
                .list_ip_sets(scope, marker.as_deref())
                .await
                .map_err(|e| {
                    log::error!("Error listing IP sets in scope '{}': {}", scope, e);
                    BlockError::Store(e)
                })?;

            if let Some(summary) = page.ip_sets.iter().find(|s| s.name == ip_set_name) {
                log::debug!("Resolved IP set '{}' to id {}", ip_set_name, summary.id);
                return Ok(IpSetHandle::from_summary(summary, scope));
            }

            match page.next_marker {
                Some(next) => {
                    if !seen_markers.insert(next.clone()) {
                        log::error!(
                            "Listing IP sets in scope '{}' repeated marker {}",
                            scope,
                            next
                        );
                        return Err(BlockError::Store(StoreError::Service {
                            status: 200,
                            code: "RepeatedNextMarker".to_string(),
                            message: format!("listing returned marker {} twice", next),
                        }));
                    }
                    marker = Some(next);
                }
                None => break,
            }
        }

        log::error!("IP set '{}' not found in scope '{}'", ip_set_name, scope);
        Err(BlockError::NotFound {
            name: ip_set_name.to_string(),
            scope,
        })
    }
}
