//! Long-running operation orchestration.
//!
//! Every mutation against the control plane is split into a fast "accepted"
//! acknowledgement ([`begin`]) and a polling phase ([`Poller::poll_until_done`]).
//! The polling phase suspends the calling task until the remote operation
//! reaches a terminal state or the [`CancelSignal`] fires. Nothing is retried
//! at this layer.
//!
//! - [`ControlPlane`] - The remote API seam (ARM over HTTP in production)
//! - [`OperationHandle`] - Token for one accepted mutation
//! - [`Poller`] - Drives a handle to its terminal result
//! - [`CancelSignal`] - Explicit cancellation and/or deadline

mod cancel;
mod poller;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

pub use cancel::CancelSignal;
pub use poller::{begin, Poller};
pub(crate) use poller::decode;

/// Poll interval used when the service gives no `Retry-After`.
pub const DEFAULT_POLL_FREQUENCY: Duration = Duration::from_secs(10);

/// A create-or-update submission.
#[derive(Debug, Clone, PartialEq)]
pub struct PutRequest {
    /// Human readable description used in logs and errors.
    pub operation: String,
    /// Absolute resource id the body is PUT to.
    pub resource_id: String,
    pub api_version: String,
    /// Extra query parameters besides `api-version`.
    pub query: Vec<(String, String)>,
    pub body: Value,
}

/// How the completion of an accepted operation is observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Monitor {
    /// URL from the `Azure-AsyncOperation` header.
    AsyncOperation(String),
    /// URL from the `Location` header.
    Location(String),
    /// The resource's own `provisioningState`.
    Resource,
}

impl fmt::Display for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Monitor::AsyncOperation(_) => f.write_str("Azure-AsyncOperation"),
            Monitor::Location(_) => f.write_str("Location"),
            Monitor::Resource => f.write_str("provisioningState"),
        }
    }
}

/// Status of an operation as last observed.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    InProgress { retry_after: Option<Duration> },
    /// Final representation of the resource.
    Succeeded(Value),
    Failed {
        code: Option<String>,
        message: String,
    },
}

impl PollStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollStatus::InProgress { .. })
    }
}

/// Returned once a mutation is accepted. Owned by exactly one [`Poller`].
#[derive(Debug, Clone, PartialEq)]
pub struct OperationHandle {
    pub operation: String,
    pub resource_id: String,
    pub api_version: String,
    pub monitor: Monitor,
    /// Status carried by the acceptance response itself.
    pub initial: PollStatus,
}

/// Remote resource-management API.
///
/// Implementations are bound to one subscription and credential and are
/// shared read-only between the typed clients of a subscription.
#[async_trait]
pub trait ControlPlane: Send + Sync + fmt::Debug {
    /// Submit a create-or-update. A synchronous refusal is
    /// [`crate::Error::RequestRejected`].
    async fn begin_create_or_update(&self, request: PutRequest) -> Result<OperationHandle>;

    /// Observe the current status of an accepted operation once.
    async fn poll(&self, handle: &OperationHandle) -> Result<PollStatus>;

    async fn get(&self, operation: &str, resource_id: &str, api_version: &str) -> Result<Value>;

    fn poll_frequency(&self) -> Duration {
        DEFAULT_POLL_FREQUENCY
    }
}
