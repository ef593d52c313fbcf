//! Invocation boundary
//!
//! One call of [`InvocationHandler::handle`] handles one detection event:
//! read the target, extract the attacker address, reconcile the IP set.

use std::sync::Arc;

use crate::blocking::IpSetReconciler;
use crate::config::TargetConfig;
use crate::detection::extract_attacker_address;
use crate::error::BlockError;
use crate::models::{DetectionEvent, InvocationResult};
use crate::store::IpSetStore;

/// Handles detection events against a long-lived store client
pub struct InvocationHandler {
    reconciler: IpSetReconciler,
}

impl InvocationHandler {
    pub fn new(store: Arc<dyn IpSetStore>) -> Self {
        InvocationHandler {
            reconciler: IpSetReconciler::new(store),
        }
    }

    /// Handle a raw JSON event, reading the target from the process environment
    pub async fn handle_json(&self, raw: &str) -> Result<Option<InvocationResult>, BlockError> {
        let event = DetectionEvent::from_json_str(raw).map_err(|e| {
            log::error!("Error parsing event: {}", e);
            BlockError::InvalidEvent(e)
        })?;
        self.handle(&event).await
    }

    /// Handle an event, reading the target from the process environment
    pub async fn handle(
        &self,
        event: &DetectionEvent,
    ) -> Result<Option<InvocationResult>, BlockError> {
        self.handle_with_lookup(event, |key| std::env::var(key).ok())
            .await
    }

    /// Handle an event, reading the target through `lookup`
    ///
    /// Returns `Ok(None)` when the event carries no attacker address; nothing
    /// is sent to the store in that case.
    pub async fn handle_with_lookup<F>(
        &self,
        event: &DetectionEvent,
        lookup: F,
    ) -> Result<Option<InvocationResult>, BlockError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let target = TargetConfig::from_lookup(lookup).map_err(|e| {
            log::error!("{}", e);
            BlockError::Configuration(e)
        })?;
        self.handle_for_target(event, &target).await
    }

    /// Handle an event against an already-read target
    pub async fn handle_for_target(
        &self,
        event: &DetectionEvent,
        target: &TargetConfig,
    ) -> Result<Option<InvocationResult>, BlockError> {
        log::info!(
            "Targeting IP set '{}' in scope '{}'",
            target.ip_set_name,
            target.scope
        );

        let address = match extract_attacker_address(event) {
            Some(address) => address,
            None => {
                log::info!("Could not extract attacker IP from the finding; nothing to do");
                return Ok(None);
            }
        };
        log::info!("Extracted attacker IP: {}", address);

        let outcome = self
            .reconciler
            .reconcile(&target.ip_set_name, target.scope, &address)
            .await?;

        Ok(Some(InvocationResult::from_outcome(outcome, &address)))
    }
}
