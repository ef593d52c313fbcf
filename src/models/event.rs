//! Detection event payloads
//!
//! Only one path of a finding is ever read:
//! `detail.service.action.networkConnectionAction.remoteIpDetails.ipAddressV4`.
//! Every level is optional and decoded leniently: a missing key, a `null`,
//! or a value of the wrong JSON type all decode as `None`.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};

/// A threat-detection finding as delivered by the event source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    #[serde(default, deserialize_with = "lenient_object", skip_serializing_if = "Option::is_none")]
    pub detail: Option<FindingDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindingDetail {
    #[serde(default, deserialize_with = "lenient_object", skip_serializing_if = "Option::is_none")]
    pub service: Option<FindingService>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindingService {
    #[serde(default, deserialize_with = "lenient_object", skip_serializing_if = "Option::is_none")]
    pub action: Option<FindingAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingAction {
    #[serde(default, deserialize_with = "lenient_object", skip_serializing_if = "Option::is_none")]
    pub network_connection_action: Option<NetworkConnectionAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConnectionAction {
    #[serde(default, deserialize_with = "lenient_object", skip_serializing_if = "Option::is_none")]
    pub remote_ip_details: Option<RemoteIpDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteIpDetails {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub ip_address_v4: Option<String>,
}

impl DetectionEvent {
    /// Decode an event from an already-parsed JSON value
    ///
    /// Never fails: anything that is not an object decodes as an empty event.
    pub fn from_value(value: serde_json::Value) -> Self {
        if !value.is_object() {
            return DetectionEvent::default();
        }
        serde_json::from_value(value).unwrap_or_default()
    }

    /// Decode an event from raw JSON text
    ///
    /// Fails only when the text is not JSON at all.
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        Ok(Self::from_value(value))
    }

    /// Build an event carrying just the remote address (test fixtures, CLI)
    pub fn with_remote_ip(ip: impl Into<String>) -> Self {
        DetectionEvent {
            detail: Some(FindingDetail {
                service: Some(FindingService {
                    action: Some(FindingAction {
                        network_connection_action: Some(NetworkConnectionAction {
                            remote_ip_details: Some(RemoteIpDetails {
                                ip_address_v4: Some(ip.into()),
                            }),
                        }),
                    }),
                }),
            }),
        }
    }
}

/// Decode a nested level; only a JSON object qualifies
///
/// Derived struct visitors also accept sequences positionally, so the shape
/// is checked before handing the value to serde.
fn lenient_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

/// Decode a terminal string field; any other JSON type is `None`
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}
