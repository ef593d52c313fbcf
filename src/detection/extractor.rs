//! Attacker address extraction
//!
//! Pulls the remote IPv4 address out of a detection finding. An event that
//! does not describe a network connection is a normal outcome, not an error.

use crate::models::DetectionEvent;

/// Extract the attacker's address from a finding
///
/// Returns `None` when any level of the path is missing or the address is
/// empty. The value is not validated as an IP; the store rejects malformed
/// entries on write.
pub fn extract_attacker_address(event: &DetectionEvent) -> Option<String> {
    let address = event
        .detail
        .as_ref()?
        .service
        .as_ref()?
        .action
        .as_ref()?
        .network_connection_action
        .as_ref()?
        .remote_ip_details
        .as_ref()?
        .ip_address_v4
        .as_deref()?;

    if address.is_empty() {
        return None;
    }

    Some(address.to_string())
}
