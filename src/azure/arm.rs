//! Azure Resource Manager transport.
//!
//! Implements [`ControlPlane`] over the ARM REST API: create-or-update is a
//! `PUT` on the resource id, completion is observed through the
//! `Azure-AsyncOperation` header, the `Location` header or the resource's own
//! `provisioningState`, in that order of preference.

use super::credential::TokenSource;
use crate::error::{Error, Result};
use crate::operation::{ControlPlane, Monitor, OperationHandle, PollStatus, PutRequest};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";

/// `Microsoft.Network` API version used for every request.
pub const NETWORK_API_VERSION: &str = "2023-09-01";

/// Upper bound for a single HTTP exchange, including reading the body.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

const ASYNC_OPERATION: &str = "azure-asyncoperation";

/// ARM client bound to one credential. Cheap to clone.
#[derive(Clone)]
pub struct ArmClient {
    http: Client,
    endpoint: String,
    token: Arc<dyn TokenSource>,
    poll_frequency: Duration,
}

impl ArmClient {
    /// # Arguments
    /// * `token` - Bearer token source for every request
    /// * `endpoint` - ARM base URL, e.g. [`DEFAULT_ARM_ENDPOINT`]
    pub fn new(
        token: Arc<dyn TokenSource>,
        endpoint: &str,
    ) -> std::result::Result<Self, Box<dyn StdError + Send + Sync>> {
        let parsed =
            Url::parse(endpoint).map_err(|e| format!("invalid ARM endpoint '{endpoint}': {e}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!("ARM endpoint '{endpoint}' must be http(s)").into());
        }
        let http = Client::builder()
            .user_agent(concat!("azure-vnet-peering/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(ArmClient {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
            poll_frequency: crate::operation::DEFAULT_POLL_FREQUENCY,
        })
    }

    pub fn with_poll_frequency(mut self, frequency: Duration) -> Self {
        self.poll_frequency = frequency;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn resource_url(&self, resource_id: &str) -> String {
        format!("{}{}", self.endpoint, resource_id)
    }

    async fn send(&self, operation: &str, builder: RequestBuilder) -> Result<Reply> {
        let token = self.token.bearer_token().await?;
        let response = builder
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| transport(operation, format!("request failed: {e}")))?;
        let status = response.status();
        let headers = response.headers().clone();
        let text = response
            .text()
            .await
            .map_err(|e| transport(operation, format!("reading response failed: {e}")))?;
        log::trace!("{operation}: HTTP {status} ({} bytes)", text.len());
        Ok(Reply {
            status,
            headers,
            text,
        })
    }

    async fn get_resource(&self, handle: &OperationHandle) -> Result<Value> {
        let builder = self
            .http
            .get(self.resource_url(&handle.resource_id))
            .query(&[("api-version", handle.api_version.as_str())]);
        let reply = self.send(&handle.operation, builder).await?;
        if !reply.status.is_success() {
            let (_, message) = arm_error(&reply.text, reply.status);
            return Err(transport(
                &handle.operation,
                format!("reading final resource state failed (HTTP {}): {message}", reply.status),
            ));
        }
        parse_json(&handle.operation, &reply.text)
    }
}

impl fmt::Debug for ArmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArmClient")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token)
            .field("poll_frequency", &self.poll_frequency)
            .finish()
    }
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    text: String,
}

#[async_trait]
impl ControlPlane for ArmClient {
    async fn begin_create_or_update(&self, request: PutRequest) -> Result<OperationHandle> {
        let builder = self
            .http
            .put(self.resource_url(&request.resource_id))
            .query(&[("api-version", request.api_version.as_str())])
            .query(&request.query)
            .json(&request.body);
        let reply = self.send(&request.operation, builder).await?;

        if !reply.status.is_success() {
            let (code, message) = arm_error(&reply.text, reply.status);
            return Err(Error::RequestRejected {
                operation: request.operation,
                status: reply.status.as_u16(),
                code,
                message,
            });
        }

        let monitor = monitor_from_headers(&reply.headers);
        let retry_after = retry_after(&reply.headers);
        let body = parse_json(&request.operation, &reply.text)?;
        let initial = if reply.status == StatusCode::ACCEPTED || body.is_null() {
            PollStatus::InProgress { retry_after }
        } else {
            status_from_resource(body, retry_after)
        };

        Ok(OperationHandle {
            operation: request.operation,
            resource_id: request.resource_id,
            api_version: request.api_version,
            monitor,
            initial,
        })
    }

    async fn poll(&self, handle: &OperationHandle) -> Result<PollStatus> {
        match &handle.monitor {
            Monitor::AsyncOperation(url) => {
                let reply = self.send(&handle.operation, self.http.get(url)).await?;
                if !reply.status.is_success() {
                    let (_, message) = arm_error(&reply.text, reply.status);
                    return Err(transport(
                        &handle.operation,
                        format!("operation status request failed (HTTP {}): {message}", reply.status),
                    ));
                }
                let status: OperationStatus = serde_json::from_str(&reply.text).map_err(|e| {
                    transport(&handle.operation, format!("invalid operation status: {e}"))
                })?;
                match status.status.as_str() {
                    s if s.eq_ignore_ascii_case("Succeeded") => {
                        Ok(PollStatus::Succeeded(self.get_resource(handle).await?))
                    }
                    s if s.eq_ignore_ascii_case("Failed") || s.eq_ignore_ascii_case("Canceled") => {
                        let (code, message) = match status.error {
                            Some(e) => (e.code, e.message.unwrap_or_else(|| format!("operation {s}"))),
                            None => (None, format!("operation {s}")),
                        };
                        Ok(PollStatus::Failed { code, message })
                    }
                    _ => Ok(PollStatus::InProgress {
                        retry_after: retry_after(&reply.headers),
                    }),
                }
            }
            Monitor::Location(url) => {
                let reply = self.send(&handle.operation, self.http.get(url)).await?;
                match reply.status {
                    StatusCode::ACCEPTED => Ok(PollStatus::InProgress {
                        retry_after: retry_after(&reply.headers),
                    }),
                    s if s.is_success() => Ok(PollStatus::Succeeded(self.get_resource(handle).await?)),
                    s => {
                        let (code, message) = arm_error(&reply.text, s);
                        Ok(PollStatus::Failed { code, message })
                    }
                }
            }
            Monitor::Resource => {
                let body = self.get_resource(handle).await?;
                Ok(status_from_resource(body, None))
            }
        }
    }

    async fn get(&self, operation: &str, resource_id: &str, api_version: &str) -> Result<Value> {
        let builder = self
            .http
            .get(self.resource_url(resource_id))
            .query(&[("api-version", api_version)]);
        let reply = self.send(operation, builder).await?;
        if !reply.status.is_success() {
            let (code, message) = arm_error(&reply.text, reply.status);
            return Err(Error::RequestRejected {
                operation: operation.to_string(),
                status: reply.status.as_u16(),
                code,
                message,
            });
        }
        parse_json(operation, &reply.text)
    }

    fn poll_frequency(&self) -> Duration {
        self.poll_frequency
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct OperationStatus {
    status: String,
    error: Option<ErrorDetail>,
}

fn transport(operation: &str, message: String) -> Error {
    Error::Transport {
        operation: operation.to_string(),
        message,
    }
}

fn parse_json(operation: &str, text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| transport(operation, format!("invalid JSON response: {e}")))
}

/// ARM error `code` and `message`, falling back to the raw body or status text.
fn arm_error(text: &str, status: StatusCode) -> (Option<String>, String) {
    match serde_json::from_str::<ErrorResponse>(text) {
        Ok(ErrorResponse { error }) => (
            error.code,
            error.message.unwrap_or_else(|| status.to_string()),
        ),
        Err(_) if !text.trim().is_empty() => (None, text.trim().to_string()),
        Err(_) => (None, status.to_string()),
    }
}

fn monitor_from_headers(headers: &HeaderMap) -> Monitor {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    if let Some(url) = header(ASYNC_OPERATION) {
        Monitor::AsyncOperation(url)
    } else if let Some(url) = header(LOCATION.as_str()) {
        Monitor::Location(url)
    } else {
        Monitor::Resource
    }
}

/// `Retry-After` in delta-seconds. HTTP-date values are ignored.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Classify a resource body by `properties.provisioningState`. A body without
/// one is treated as provisioned.
fn status_from_resource(body: Value, retry_after: Option<Duration>) -> PollStatus {
    let state = body
        .pointer("/properties/provisioningState")
        .and_then(Value::as_str)
        .map(str::to_string);
    match state.as_deref() {
        None => PollStatus::Succeeded(body),
        Some(s) if s.eq_ignore_ascii_case("Succeeded") => PollStatus::Succeeded(body),
        Some(s) if s.eq_ignore_ascii_case("Failed") || s.eq_ignore_ascii_case("Canceled") => {
            PollStatus::Failed {
                code: None,
                message: format!("provisioningState is {s}"),
            }
        }
        Some(_) => PollStatus::InProgress { retry_after },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::StaticToken;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_monitor_prefers_async_operation() {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_static("https://loc"));
        assert_eq!(
            monitor_from_headers(&headers),
            Monitor::Location("https://loc".to_string())
        );
        headers.insert(ASYNC_OPERATION, HeaderValue::from_static("https://op"));
        assert_eq!(
            monitor_from_headers(&headers),
            Monitor::AsyncOperation("https://op".to_string())
        );
        assert_eq!(monitor_from_headers(&HeaderMap::new()), Monitor::Resource);
    }

    #[test]
    fn test_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn test_status_from_resource() {
        let updating = json!({"properties": {"provisioningState": "Updating"}});
        assert!(matches!(
            status_from_resource(updating, None),
            PollStatus::InProgress { .. }
        ));
        let done = json!({"properties": {"provisioningState": "Succeeded"}});
        assert!(matches!(
            status_from_resource(done, None),
            PollStatus::Succeeded(_)
        ));
        let failed = json!({"properties": {"provisioningState": "Failed"}});
        assert!(matches!(
            status_from_resource(failed, None),
            PollStatus::Failed { .. }
        ));
        assert!(matches!(
            status_from_resource(json!({"name": "x"}), None),
            PollStatus::Succeeded(_)
        ));
        let canceled = json!({"properties": {"provisioningState": "Canceled"}});
        match status_from_resource(canceled, None) {
            PollStatus::Failed { code, message } => {
                assert_eq!(code, None);
                assert_eq!(message, "provisioningState is Canceled");
            }
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn test_arm_error_parsing() {
        let body = r#"{"error":{"code":"InvalidResourceReference","message":"Resource /x not found"}}"#;
        assert_eq!(
            arm_error(body, StatusCode::BAD_REQUEST),
            (
                Some("InvalidResourceReference".to_string()),
                "Resource /x not found".to_string()
            )
        );
        assert_eq!(
            arm_error("", StatusCode::FORBIDDEN),
            (None, "403 Forbidden".to_string())
        );
        assert_eq!(arm_error("gateway down", StatusCode::BAD_GATEWAY).1, "gateway down");
    }

    #[test]
    fn test_new_rejects_bad_endpoint() {
        let token: Arc<dyn TokenSource> = Arc::new(StaticToken::new("t"));
        assert!(ArmClient::new(token.clone(), "not a url").is_err());
        assert!(ArmClient::new(token.clone(), "ftp://example.com").is_err());
        let client = ArmClient::new(token, "https://management.azure.com/").unwrap();
        assert_eq!(client.endpoint(), "https://management.azure.com");
    }
}
