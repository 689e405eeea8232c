//! In-memory control plane shared by the integration tests.
//!
//! One `FakeCloud` stands for the whole tenant: every subscription's client
//! set points at the same instance, so a peering submitted from the hub
//! subscription can see virtual networks owned by the spoke subscription.

#![allow(dead_code)]

use async_trait::async_trait;
use azure_vnet_peering::azure::{SubscriptionClientSet, SubscriptionClients};
use azure_vnet_peering::models::{resource_id, NetworkRef};
use azure_vnet_peering::operation::{
    ControlPlane, Monitor, OperationHandle, PollStatus, PutRequest,
};
use azure_vnet_peering::{Error, Result};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const HUB_SUB: &str = "11111111-1111-1111-1111-111111111111";
pub const SPOKE_SUB: &str = "22222222-2222-2222-2222-222222222222";

pub fn hub() -> NetworkRef {
    NetworkRef::new(HUB_SUB, "hub-rg", "hub-vnet")
}

pub fn spoke() -> NetworkRef {
    NetworkRef::new(SPOKE_SUB, "spoke-rg", "spoke-vnet")
}

#[derive(Debug, Default)]
struct State {
    resources: HashMap<String, Value>,
    puts: Vec<PutRequest>,
    polls: HashMap<String, u32>,
    fail: HashSet<String>,
}

#[derive(Debug)]
pub struct FakeCloud {
    state: Mutex<State>,
    /// Polls answered `InProgress` before an operation finishes.
    pending_polls: u32,
    never_finish: bool,
    /// Time each submission takes before it is answered.
    begin_delay: Duration,
    /// Time each status request takes before it is answered.
    poll_delay: Duration,
}

impl FakeCloud {
    pub fn new() -> Arc<Self> {
        Self::with_pending_polls(0)
    }

    pub fn with_pending_polls(pending_polls: u32) -> Arc<Self> {
        Arc::new(FakeCloud {
            state: Mutex::new(State::default()),
            pending_polls,
            never_finish: false,
            begin_delay: Duration::ZERO,
            poll_delay: Duration::ZERO,
        })
    }

    /// Accepts every mutation and never reports a terminal state.
    pub fn never_finishing() -> Arc<Self> {
        Arc::new(FakeCloud {
            state: Mutex::new(State::default()),
            pending_polls: 0,
            never_finish: true,
            begin_delay: Duration::ZERO,
            poll_delay: Duration::ZERO,
        })
    }

    /// Every operation needs one status request; submissions and status
    /// requests take the given time to answer.
    pub fn slow(begin_delay: Duration, poll_delay: Duration) -> Arc<Self> {
        Arc::new(FakeCloud {
            state: Mutex::new(State::default()),
            pending_polls: 0,
            never_finish: false,
            begin_delay,
            poll_delay,
        })
    }

    pub fn add_vnet(&self, network: &NetworkRef, location: &str, prefix: &str) {
        let id = network.resource_id().unwrap();
        let vnet = json!({
            "id": id,
            "name": network.vnet_name,
            "location": location,
            "properties": {
                "addressSpace": { "addressPrefixes": [prefix] },
                "subnets": [],
                "provisioningState": "Succeeded"
            }
        });
        self.state.lock().unwrap().resources.insert(key(&id), vnet);
    }

    /// Accept mutations of `resource_id` but finish them as `Failed`.
    pub fn fail_operation_on(&self, resource_id: &str) {
        self.state.lock().unwrap().fail.insert(key(resource_id));
    }

    pub fn puts(&self) -> Vec<PutRequest> {
        self.state.lock().unwrap().puts.clone()
    }

    pub fn total_polls(&self) -> u32 {
        self.state.lock().unwrap().polls.values().sum()
    }

    pub fn resource(&self, resource_id: &str) -> Option<Value> {
        self.state
            .lock()
            .unwrap()
            .resources
            .get(&key(resource_id))
            .cloned()
    }

    pub fn count_under(&self, prefix: &str) -> usize {
        let prefix = key(prefix);
        self.state
            .lock()
            .unwrap()
            .resources
            .keys()
            .filter(|k| k.starts_with(&prefix) && k.len() > prefix.len())
            .count()
    }

    pub fn clients(self: &Arc<Self>) -> SubscriptionClients {
        let mut clients = SubscriptionClients::new();
        for sub in [HUB_SUB, SPOKE_SUB] {
            let plane: Arc<dyn ControlPlane> = self.clone();
            clients.insert(SubscriptionClientSet::with_control_plane(plane, sub).unwrap());
        }
        clients
    }

    fn stored(&self, request: &PutRequest) -> Value {
        let mut body = request.body.clone();
        let name = request.resource_id.rsplit('/').next().unwrap_or_default();
        body["id"] = json!(request.resource_id);
        body["name"] = json!(name);
        if !body["properties"].is_object() {
            body["properties"] = json!({});
        }
        body["properties"]["provisioningState"] = json!("Succeeded");
        if body["properties"].get("remoteVirtualNetwork").is_some() {
            body["properties"]["peeringState"] = json!("Connected");
            body["properties"]["peeringSyncLevel"] = json!("FullyInSync");
        }
        body
    }
}

fn key(resource_id: &str) -> String {
    resource_id.to_ascii_lowercase()
}

fn rejected(request: &PutRequest, status: u16, code: &str, message: String) -> Error {
    Error::RequestRejected {
        operation: request.operation.clone(),
        status,
        code: Some(code.to_string()),
        message,
    }
}

/// Parent resource of a child such as a peering or route.
fn parent_of(resource_id: &str) -> Option<&str> {
    let mut parts = resource_id.rsplitn(3, '/');
    parts.next()?;
    parts.next()?;
    parts.next()
}

#[async_trait]
impl ControlPlane for FakeCloud {
    async fn begin_create_or_update(&self, request: PutRequest) -> Result<OperationHandle> {
        if !self.begin_delay.is_zero() {
            tokio::time::sleep(self.begin_delay).await;
        }
        let mut state = self.state.lock().unwrap();
        state.puts.push(request.clone());

        if request.resource_id.contains("/virtualNetworkPeerings/")
            || request.resource_id.contains("/routes/")
        {
            let parent = parent_of(&request.resource_id).unwrap_or_default();
            if !state.resources.contains_key(&key(parent)) {
                return Err(rejected(
                    &request,
                    404,
                    "ResourceNotFound",
                    format!("parent resource '{parent}' was not found"),
                ));
            }
        }
        if let Some(remote) = request
            .body
            .pointer("/properties/remoteVirtualNetwork/id")
            .and_then(Value::as_str)
        {
            if !state.resources.contains_key(&key(remote)) {
                return Err(rejected(
                    &request,
                    400,
                    "InvalidResourceReference",
                    format!("remote virtual network '{remote}' was not found"),
                ));
            }
        }

        let stored = self.stored(&request);
        state
            .resources
            .insert(key(&request.resource_id), stored.clone());
        state.polls.insert(key(&request.resource_id), 0);

        let failing = state.fail.contains(&key(&request.resource_id));
        let initial = if failing
            || self.never_finish
            || self.pending_polls > 0
            || !self.poll_delay.is_zero()
        {
            PollStatus::InProgress { retry_after: None }
        } else {
            PollStatus::Succeeded(stored)
        };
        Ok(OperationHandle {
            operation: request.operation,
            resource_id: request.resource_id,
            api_version: request.api_version,
            monitor: Monitor::Resource,
            initial,
        })
    }

    async fn poll(&self, handle: &OperationHandle) -> Result<PollStatus> {
        if !self.poll_delay.is_zero() {
            tokio::time::sleep(self.poll_delay).await;
        }
        let mut state = self.state.lock().unwrap();
        let id = key(&handle.resource_id);
        let count = {
            let count = state.polls.entry(id.clone()).or_insert(0);
            *count += 1;
            *count
        };
        if self.never_finish || count <= self.pending_polls {
            return Ok(PollStatus::InProgress { retry_after: None });
        }
        if state.fail.contains(&id) {
            return Ok(PollStatus::Failed {
                code: Some("Conflict".to_string()),
                message: "another operation is in progress on the remote network".to_string(),
            });
        }
        match state.resources.get(&id) {
            Some(resource) => Ok(PollStatus::Succeeded(resource.clone())),
            None => Ok(PollStatus::Failed {
                code: Some("ResourceNotFound".to_string()),
                message: format!("'{}' disappeared", handle.resource_id),
            }),
        }
    }

    async fn get(&self, operation: &str, resource_id: &str, _api_version: &str) -> Result<Value> {
        let state = self.state.lock().unwrap();
        state
            .resources
            .get(&key(resource_id))
            .cloned()
            .ok_or_else(|| Error::RequestRejected {
                operation: operation.to_string(),
                status: 404,
                code: Some("ResourceNotFound".to_string()),
                message: format!("'{resource_id}' was not found"),
            })
    }

    fn poll_frequency(&self) -> Duration {
        Duration::from_millis(1)
    }
}

pub fn peering_id(local: &NetworkRef, name: &str) -> String {
    resource_id::peering_id(
        &local.subscription_id,
        &local.resource_group,
        &local.vnet_name,
        name,
    )
    .unwrap()
}
