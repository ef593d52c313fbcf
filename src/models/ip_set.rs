use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Where an IP set applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Scope {
    /// Regional resources (load balancers, API gateways)
    Regional,
    /// Global edge distributions
    Cloudfront,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid scope '{0}': expected REGIONAL or CLOUDFRONT")]
pub struct ParseScopeError(pub String);

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Regional => "REGIONAL",
            Scope::Cloudfront => "CLOUDFRONT",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = ParseScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "REGIONAL" => Ok(Scope::Regional),
            "CLOUDFRONT" | "GLOBAL" => Ok(Scope::Cloudfront),
            _ => Err(ParseScopeError(s.to_string())),
        }
    }
}

/// One entry of a scope listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpSetSummary {
    pub name: String,
    pub id: String,
    pub description: Option<String>,
    pub arn: Option<String>,
}

/// A page of a scope listing; `next_marker` is set while more pages remain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpSetPage {
    pub ip_sets: Vec<IpSetSummary>,
    pub next_marker: Option<String>,
}

/// A resolved IP set: name and scope as configured, id as assigned by the store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IpSetHandle {
    pub name: String,
    pub scope: Scope,
    pub id: String,
}

impl IpSetHandle {
    pub fn from_summary(summary: &IpSetSummary, scope: Scope) -> Self {
        IpSetHandle {
            name: summary.name.clone(),
            scope,
            id: summary.id.clone(),
        }
    }
}

/// Contents and lock token from a single read of an IP set
///
/// The token is only valid for the next write to the same set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpSetSnapshot {
    pub addresses: Vec<String>,
    pub lock_token: String,
}

impl IpSetSnapshot {
    /// Whether `address` is already present, ignoring any mask suffix on stored entries
    pub fn contains_host(&self, address: &str) -> bool {
        self.addresses.iter().any(|cidr| host_part(cidr) == address)
    }

    /// Fetched addresses plus `<address>/32`; the snapshot itself is left untouched
    pub fn with_host_added(&self, address: &str) -> Vec<String> {
        let mut addresses = Vec::with_capacity(self.addresses.len() + 1);
        addresses.extend(self.addresses.iter().cloned());
        addresses.push(format!("{}/32", address));
        addresses
    }
}

fn host_part(cidr: &str) -> &str {
    cidr.split('/').next().unwrap_or(cidr)
}

/// Result of reconciling one address against an IP set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockOutcome {
    AlreadyBlocked,
    Blocked,
}

/// What a completed invocation returns to the invoking infrastructure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResult {
    pub status_code: u16,
    /// JSON-encoded message string
    pub body: String,
}

impl InvocationResult {
    pub fn from_outcome(outcome: BlockOutcome, address: &str) -> Self {
        let message = match outcome {
            BlockOutcome::AlreadyBlocked => format!("IP {} was already blocked.", address),
            BlockOutcome::Blocked => format!("Successfully blocked IP: {}", address),
        };

        InvocationResult {
            status_code: 200,
            body: serde_json::Value::String(message).to_string(),
        }
    }

    /// The decoded message text
    pub fn message(&self) -> String {
        serde_json::from_str::<String>(&self.body).unwrap_or_else(|_| self.body.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(addresses: &[&str]) -> IpSetSnapshot {
        IpSetSnapshot {
            addresses: addresses.iter().map(|a| a.to_string()).collect(),
            lock_token: "token-1".to_string(),
        }
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!("REGIONAL".parse::<Scope>(), Ok(Scope::Regional));
        assert_eq!("regional".parse::<Scope>(), Ok(Scope::Regional));
        assert_eq!("CLOUDFRONT".parse::<Scope>(), Ok(Scope::Cloudfront));
        assert_eq!("global".parse::<Scope>(), Ok(Scope::Cloudfront));
        assert!("EDGE".parse::<Scope>().is_err());
        assert!("".parse::<Scope>().is_err());
    }

    #[test]
    fn test_scope_wire_format() {
        assert_eq!(serde_json::to_string(&Scope::Regional).unwrap(), "\"REGIONAL\"");
        assert_eq!(Scope::Cloudfront.to_string(), "CLOUDFRONT");
    }

    #[test]
    fn test_contains_host_strips_mask() {
        let snap = snapshot(&["203.0.113.7/32", "10.0.0.0/8"]);
        assert!(snap.contains_host("203.0.113.7"));
        assert!(snap.contains_host("10.0.0.0"));
        // Exact host match only, no range containment
        assert!(!snap.contains_host("10.0.0.1"));
        assert!(!snap.contains_host("203.0.113.70"));
    }

    #[test]
    fn test_with_host_added_leaves_snapshot_alone() {
        let snap = snapshot(&["198.51.100.0/32"]);
        let updated = snap.with_host_added("203.0.113.7");

        assert_eq!(updated, vec!["198.51.100.0/32", "203.0.113.7/32"]);
        assert_eq!(snap.addresses, vec!["198.51.100.0/32"]);
    }

    #[test]
    fn test_invocation_result_messages() {
        let result = InvocationResult::from_outcome(BlockOutcome::AlreadyBlocked, "1.2.3.4");
        assert_eq!(result.status_code, 200);
        assert_eq!(result.body, "\"IP 1.2.3.4 was already blocked.\"");
        assert_eq!(result.message(), "IP 1.2.3.4 was already blocked.");

        let result = InvocationResult::from_outcome(BlockOutcome::Blocked, "1.2.3.4");
        assert_eq!(result.message(), "Successfully blocked IP: 1.2.3.4");

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["statusCode"], 200);
    }
}
