//! HTTP implementation of the IpSetStore trait
//!
//! Speaks the WAFv2 JSON 1.1 protocol: every operation is a `POST /` with the
//! operation named in the `X-Amz-Target` header and a PascalCase JSON body.
//! Request signing is left to the endpoint (or a signing proxy in front of
//! it); an optional bearer token is forwarded as-is.

use super::{IpSetStore, StoreError};
use crate::config::StoreConfig;
use crate::models::{IpSetHandle, IpSetPage, IpSetSnapshot, IpSetSummary, Scope};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const TARGET_PREFIX: &str = "AWSWAF_20190729";
const CONTENT_TYPE_JSON_11: &str = "application/x-amz-json-1.1";

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ListIpSetsRequest<'a> {
    scope: Scope,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_marker: Option<&'a str>,
    limit: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListIpSetsResponse {
    #[serde(rename = "IPSets", default)]
    ip_sets: Vec<IpSetSummaryWire>,
    next_marker: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IpSetSummaryWire {
    name: String,
    id: String,
    description: Option<String>,
    #[serde(rename = "ARN")]
    arn: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetIpSetRequest<'a> {
    name: &'a str,
    scope: Scope,
    id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetIpSetResponse {
    #[serde(rename = "IPSet")]
    ip_set: IpSetWire,
    lock_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IpSetWire {
    #[serde(default)]
    addresses: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct UpdateIpSetRequest<'a> {
    name: &'a str,
    scope: Scope,
    id: &'a str,
    addresses: &'a [String],
    lock_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UpdateIpSetResponse {
    next_lock_token: String,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(rename = "__type", default)]
    error_type: String,
    #[serde(alias = "Message", default)]
    message: String,
}

/// IP set store reached over HTTP
pub struct HttpIpSetStore {
    client: Client,
    endpoint: String,
    auth_token: Option<String>,
    list_page_limit: u32,
}

impl HttpIpSetStore {
    /// Build a store client; meant to be created once per process and reused
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(HttpIpSetStore {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            list_page_limit: config.list_page_limit,
        })
    }

    /// Issue one protocol call and decode its response
    async fn call<Req, Resp>(&self, operation: &str, request: &Req) -> Result<Resp, StoreError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}/", self.endpoint);
        log::debug!("{} -> {}", operation, url);

        let mut builder = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON_11)
            .header("X-Amz-Target", format!("{}.{}", TARGET_PREFIX, operation))
            .body(serde_json::to_vec(request)?);

        if let Some(ref token) = self.auth_token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            log::warn!("{} returned non-success status: {}", operation, status);
            return Err(map_error(status.as_u16(), &bytes));
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Translate an error response into the store's error taxonomy
fn map_error(status: u16, body: &[u8]) -> StoreError {
    let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
    // "__type" may be namespaced, e.g. "com.amazonaws.wafv2#WAFOptimisticLockException"
    let code = parsed
        .error_type
        .rsplit('#')
        .next()
        .unwrap_or_default()
        .to_string();
    let message = parsed.message;

    match code.as_str() {
        "WAFOptimisticLockException" => StoreError::Conflict(message),
        "WAFNonexistentItemException" => StoreError::NotFound(message),
        "AccessDeniedException" => StoreError::AccessDenied(message),
        "ThrottlingException" | "WAFLimitsExceededException" => StoreError::Throttled(message),
        "WAFInvalidParameterException" | "WAFInvalidOperationException" => {
            StoreError::InvalidParameter(message)
        }
        _ if status == 403 => StoreError::AccessDenied(message),
        _ if status == 429 => StoreError::Throttled(message),
        _ => StoreError::Service {
            status,
            code,
            message,
        },
    }
}

#[async_trait]
impl IpSetStore for HttpIpSetStore {
    async fn list_ip_sets(
        &self,
        scope: Scope,
        marker: Option<&str>,
    ) -> Result<IpSetPage, StoreError> {
        let request = ListIpSetsRequest {
            scope,
            next_marker: marker,
            limit: self.list_page_limit,
        };
        let response: ListIpSetsResponse = self.call("ListIPSets", &request).await?;

        Ok(IpSetPage {
            ip_sets: response
                .ip_sets
                .into_iter()
                .map(|s| IpSetSummary {
                    name: s.name,
                    id: s.id,
                    description: s.description,
                    arn: s.arn,
                })
                .collect(),
            next_marker: response.next_marker.filter(|m| !m.is_empty()),
        })
    }

    async fn get_ip_set(&self, handle: &IpSetHandle) -> Result<IpSetSnapshot, StoreError> {
        let request = GetIpSetRequest {
            name: &handle.name,
            scope: handle.scope,
            id: &handle.id,
        };
        let response: GetIpSetResponse = self.call("GetIPSet", &request).await?;

        Ok(IpSetSnapshot {
            addresses: response.ip_set.addresses,
            lock_token: response.lock_token,
        })
    }

    async fn update_ip_set(
        &self,
        handle: &IpSetHandle,
        addresses: &[String],
        lock_token: &str,
    ) -> Result<String, StoreError> {
        let request = UpdateIpSetRequest {
            name: &handle.name,
            scope: handle.scope,
            id: &handle.id,
            addresses,
            lock_token,
        };
        let response: UpdateIpSetResponse = self.call("UpdateIPSet", &request).await?;
        Ok(response.next_lock_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_for(server: &MockServer) -> HttpIpSetStore {
        HttpIpSetStore::new(&StoreConfig {
            endpoint: server.uri(),
            region: None,
            timeout_seconds: 5,
            list_page_limit: 100,
            auth_token: None,
        })
        .unwrap()
    }

    fn handle() -> IpSetHandle {
        IpSetHandle {
            name: "blocked".to_string(),
            scope: Scope::Regional,
            id: "abc-123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_list_ip_sets() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("x-amz-target", "AWSWAF_20190729.ListIPSets"))
            .and(header("content-type", "application/x-amz-json-1.1"))
            .and(body_json(json!({ "Scope": "REGIONAL", "Limit": 100 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "IPSets": [
                    { "Name": "blocked", "Id": "abc-123", "LockToken": "t1", "ARN": "arn:x" }
                ],
                "NextMarker": "page-2"
            })))
            .mount(&server)
            .await;

        let page = store_for(&server)
            .list_ip_sets(Scope::Regional, None)
            .await
            .unwrap();
        assert_eq!(page.ip_sets.len(), 1);
        assert_eq!(page.ip_sets[0].id, "abc-123");
        assert_eq!(page.ip_sets[0].arn.as_deref(), Some("arn:x"));
        assert_eq!(page.next_marker.as_deref(), Some("page-2"));
    }

    #[tokio::test]
    async fn test_get_ip_set() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-amz-target", "AWSWAF_20190729.GetIPSet"))
            .and(body_json(json!({ "Name": "blocked", "Scope": "REGIONAL", "Id": "abc-123" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "IPSet": {
                    "Name": "blocked",
                    "Id": "abc-123",
                    "IPAddressVersion": "IPV4",
                    "Addresses": ["198.51.100.0/32"]
                },
                "LockToken": "token-1"
            })))
            .mount(&server)
            .await;

        let snap = store_for(&server).get_ip_set(&handle()).await.unwrap();
        assert_eq!(snap.addresses, vec!["198.51.100.0/32"]);
        assert_eq!(snap.lock_token, "token-1");
    }

    #[tokio::test]
    async fn test_update_ip_set() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-amz-target", "AWSWAF_20190729.UpdateIPSet"))
            .and(body_json(json!({
                "Name": "blocked",
                "Scope": "REGIONAL",
                "Id": "abc-123",
                "Addresses": ["198.51.100.0/32", "203.0.113.7/32"],
                "LockToken": "token-1"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "NextLockToken": "token-2" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let addresses = vec!["198.51.100.0/32".to_string(), "203.0.113.7/32".to_string()];
        let next = store_for(&server)
            .update_ip_set(&handle(), &addresses, "token-1")
            .await
            .unwrap();
        assert_eq!(next, "token-2");
    }

    #[tokio::test]
    async fn test_optimistic_lock_maps_to_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "__type": "com.amazonaws.wafv2#WAFOptimisticLockException",
                "Message": "AWS WAF couldn't save your changes because someone changed the resource"
            })))
            .mount(&server)
            .await;

        let result = store_for(&server)
            .update_ip_set(&handle(), &[], "stale")
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_bearer_token_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "IPSets": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let store = HttpIpSetStore::new(&StoreConfig {
            endpoint: format!("{}/", server.uri()),
            region: None,
            timeout_seconds: 5,
            list_page_limit: 10,
            auth_token: Some("secret".to_string()),
        })
        .unwrap();

        let page = store.list_ip_sets(Scope::Cloudfront, None).await.unwrap();
        assert!(page.ip_sets.is_empty());
        assert!(page.next_marker.is_none());
    }

    #[test]
    fn test_map_error_codes() {
        let body = |t: &str| json!({ "__type": t, "message": "m" }).to_string().into_bytes();

        assert!(matches!(
            map_error(400, &body("WAFNonexistentItemException")),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            map_error(400, &body("AccessDeniedException")),
            StoreError::AccessDenied(_)
        ));
        assert!(matches!(
            map_error(400, &body("WAFLimitsExceededException")),
            StoreError::Throttled(_)
        ));
        assert!(matches!(
            map_error(400, &body("WAFInvalidParameterException")),
            StoreError::InvalidParameter(_)
        ));
        assert!(matches!(map_error(403, b"not json"), StoreError::AccessDenied(_)));
        assert!(matches!(map_error(429, b""), StoreError::Throttled(_)));

        match map_error(500, &body("WAFInternalErrorException")) {
            StoreError::Service { status, code, message } => {
                assert_eq!(status, 500);
                assert_eq!(code, "WAFInternalErrorException");
                assert_eq!(message, "m");
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
