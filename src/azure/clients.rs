//! Typed per-subscription clients.
//!
//! A [`SubscriptionClientSet`] holds the four clients needed to reconcile a
//! subscription's networks. All four are bound to the same subscription and
//! credential when the set is built, and a set is never returned partially
//! built: the first client that fails to construct fails the whole set.

use super::arm::{ArmClient, DEFAULT_ARM_ENDPOINT, NETWORK_API_VERSION};
use super::credential::{is_guid, AuthContext, TokenSource};
use crate::error::{ClientKind, Error, Result};
use crate::models::{
    resource_id, NetworkRef, PeeringRequest, Route, RouteSpec, RouteTable, VirtualNetwork,
    VirtualNetworkPeering,
};
use crate::operation::{begin, decode, ControlPlane, Poller, PutRequest, DEFAULT_POLL_FREQUENCY};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

/// Settings shared by every client a factory builds.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub endpoint: String,
    pub poll_frequency: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            endpoint: DEFAULT_ARM_ENDPOINT.to_string(),
            poll_frequency: DEFAULT_POLL_FREQUENCY,
        }
    }
}

fn check_subscription(kind: ClientKind, subscription_id: &str) -> Result<()> {
    if is_guid(subscription_id) {
        Ok(())
    } else {
        Err(Error::ClientConstruction {
            kind,
            subscription_id: subscription_id.to_string(),
            reason: "subscription id must be a GUID".to_string(),
        })
    }
}

/// Reject references that point into another subscription than the client's.
fn check_local(subscription_id: &str, local: &str, what: &str) -> Result<()> {
    if local.eq_ignore_ascii_case(subscription_id) {
        Ok(())
    } else {
        Err(Error::InvalidReference(format!(
            "{what} belongs to subscription '{local}' but the client is bound to '{subscription_id}'"
        )))
    }
}

fn to_body<S: serde::Serialize>(operation: &str, value: &S) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| Error::Transport {
        operation: operation.to_string(),
        message: format!("serializing request body failed: {e}"),
    })
}

#[derive(Debug, Clone)]
pub struct RouteTablesClient {
    subscription_id: String,
    plane: Arc<dyn ControlPlane>,
}

impl RouteTablesClient {
    pub fn new(subscription_id: &str, plane: Arc<dyn ControlPlane>) -> Result<Self> {
        check_subscription(ClientKind::RouteTables, subscription_id)?;
        Ok(RouteTablesClient {
            subscription_id: subscription_id.to_string(),
            plane,
        })
    }

    pub async fn begin_create_or_update(
        &self,
        resource_group: &str,
        route_table_name: &str,
        location: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<Poller<RouteTable>> {
        let resource_id =
            resource_id::route_table_id(&self.subscription_id, resource_group, route_table_name)?;
        if location.trim().is_empty() {
            return Err(Error::InvalidReference(format!(
                "route table '{route_table_name}' needs a location"
            )));
        }
        let operation = format!("create route table '{route_table_name}' in '{resource_group}'");
        let params = RouteTable {
            location: Some(location.to_string()),
            tags: tags.clone(),
            ..Default::default()
        };
        let body = to_body(&operation, &params)?;
        begin(
            self.plane.clone(),
            PutRequest {
                operation,
                resource_id,
                api_version: NETWORK_API_VERSION.to_string(),
                query: vec![],
                body,
            },
        )
        .await
    }

    pub async fn get(&self, resource_group: &str, route_table_name: &str) -> Result<RouteTable> {
        let resource_id =
            resource_id::route_table_id(&self.subscription_id, resource_group, route_table_name)?;
        let operation = format!("get route table '{route_table_name}' in '{resource_group}'");
        let body = self
            .plane
            .get(&operation, &resource_id, NETWORK_API_VERSION)
            .await?;
        decode(&operation, body)
    }
}

#[derive(Debug, Clone)]
pub struct RoutesClient {
    subscription_id: String,
    plane: Arc<dyn ControlPlane>,
}

impl RoutesClient {
    pub fn new(subscription_id: &str, plane: Arc<dyn ControlPlane>) -> Result<Self> {
        check_subscription(ClientKind::Routes, subscription_id)?;
        Ok(RoutesClient {
            subscription_id: subscription_id.to_string(),
            plane,
        })
    }

    /// The route id is always derived from the owning route table.
    pub async fn begin_create_or_update(
        &self,
        resource_group: &str,
        route_table_name: &str,
        route: &RouteSpec,
    ) -> Result<Poller<Route>> {
        route.validate()?;
        let resource_id = resource_id::route_id(
            &self.subscription_id,
            resource_group,
            route_table_name,
            &route.name,
        )?;
        let operation = format!(
            "create route '{}' in route table '{route_table_name}'",
            route.name
        );
        let body = to_body(&operation, &route.to_resource(resource_id.clone()))?;
        begin(
            self.plane.clone(),
            PutRequest {
                operation,
                resource_id,
                api_version: NETWORK_API_VERSION.to_string(),
                query: vec![],
                body,
            },
        )
        .await
    }
}

#[derive(Debug, Clone)]
pub struct VirtualNetworksClient {
    subscription_id: String,
    plane: Arc<dyn ControlPlane>,
}

impl VirtualNetworksClient {
    pub fn new(subscription_id: &str, plane: Arc<dyn ControlPlane>) -> Result<Self> {
        check_subscription(ClientKind::VirtualNetworks, subscription_id)?;
        Ok(VirtualNetworksClient {
            subscription_id: subscription_id.to_string(),
            plane,
        })
    }

    pub async fn get(&self, resource_group: &str, vnet_name: &str) -> Result<VirtualNetwork> {
        let resource_id = resource_id::vnet_id(&self.subscription_id, resource_group, vnet_name)?;
        let operation = format!("get virtual network '{vnet_name}' in '{resource_group}'");
        let body = self
            .plane
            .get(&operation, &resource_id, NETWORK_API_VERSION)
            .await?;
        decode(&operation, body)
    }
}

#[derive(Debug, Clone)]
pub struct VirtualNetworkPeeringsClient {
    subscription_id: String,
    plane: Arc<dyn ControlPlane>,
}

impl VirtualNetworkPeeringsClient {
    pub fn new(subscription_id: &str, plane: Arc<dyn ControlPlane>) -> Result<Self> {
        check_subscription(ClientKind::VirtualNetworkPeerings, subscription_id)?;
        Ok(VirtualNetworkPeeringsClient {
            subscription_id: subscription_id.to_string(),
            plane,
        })
    }

    /// Submit the peering on `request.local`, which must live in this
    /// client's subscription.
    pub async fn begin_create_or_update(
        &self,
        request: &PeeringRequest,
    ) -> Result<Poller<VirtualNetworkPeering>> {
        let local = &request.local;
        check_local(&self.subscription_id, &local.subscription_id, "local network")?;
        let resource_id = resource_id::peering_id(
            &self.subscription_id,
            &local.resource_group,
            &local.vnet_name,
            &request.peering_name,
        )?;
        let operation = format!(
            "create virtual network peering '{}' from '{}' to '{}'",
            request.peering_name, local.vnet_name, request.remote.vnet_name
        );
        let mut query = Vec::new();
        if request.options.sync_remote_address_space {
            query.push(("syncRemoteAddressSpace".to_string(), "true".to_string()));
        }
        let body = to_body(&operation, &request.to_resource())?;
        begin(
            self.plane.clone(),
            PutRequest {
                operation,
                resource_id,
                api_version: NETWORK_API_VERSION.to_string(),
                query,
                body,
            },
        )
        .await
    }

    pub async fn get(&self, local: &NetworkRef, peering_name: &str) -> Result<VirtualNetworkPeering> {
        check_local(&self.subscription_id, &local.subscription_id, "local network")?;
        let resource_id = resource_id::peering_id(
            &self.subscription_id,
            &local.resource_group,
            &local.vnet_name,
            peering_name,
        )?;
        let operation = format!(
            "get virtual network peering '{peering_name}' on '{}'",
            local.vnet_name
        );
        let body = self
            .plane
            .get(&operation, &resource_id, NETWORK_API_VERSION)
            .await?;
        decode(&operation, body)
    }
}

/// The four clients of one subscription.
#[derive(Debug, Clone)]
pub struct SubscriptionClientSet {
    subscription_id: String,
    route_tables: RouteTablesClient,
    routes: RoutesClient,
    virtual_networks: VirtualNetworksClient,
    vnet_peerings: VirtualNetworkPeeringsClient,
}

impl SubscriptionClientSet {
    /// Build the ARM-backed client set for `subscription_id`.
    ///
    /// # Returns
    /// * `Ok(SubscriptionClientSet)` - All four clients were built
    /// * `Err(Error::ClientConstruction)` - Names the first client kind that failed
    pub fn new(
        auth: &AuthContext,
        subscription_id: &str,
        options: &ClientOptions,
    ) -> Result<Self> {
        let token: Arc<dyn TokenSource> = Arc::new(auth.clone());
        Self::with_token_source(token, subscription_id, options)
    }

    /// Like [`SubscriptionClientSet::new`] with any token source.
    pub fn with_token_source(
        token: Arc<dyn TokenSource>,
        subscription_id: &str,
        options: &ClientOptions,
    ) -> Result<Self> {
        let plane = |kind: ClientKind| -> Result<Arc<dyn ControlPlane>> {
            let arm = ArmClient::new(token.clone(), &options.endpoint).map_err(|e| {
                Error::ClientConstruction {
                    kind,
                    subscription_id: subscription_id.to_string(),
                    reason: e.to_string(),
                }
            })?;
            Ok(Arc::new(arm.with_poll_frequency(options.poll_frequency)))
        };
        let set = SubscriptionClientSet {
            subscription_id: subscription_id.to_string(),
            route_tables: RouteTablesClient::new(subscription_id, plane(ClientKind::RouteTables)?)?,
            routes: RoutesClient::new(subscription_id, plane(ClientKind::Routes)?)?,
            virtual_networks: VirtualNetworksClient::new(
                subscription_id,
                plane(ClientKind::VirtualNetworks)?,
            )?,
            vnet_peerings: VirtualNetworkPeeringsClient::new(
                subscription_id,
                plane(ClientKind::VirtualNetworkPeerings)?,
            )?,
        };
        log::debug!("created clients for subscription {subscription_id}");
        Ok(set)
    }

    /// Build a set whose clients all share `plane`.
    pub fn with_control_plane(plane: Arc<dyn ControlPlane>, subscription_id: &str) -> Result<Self> {
        Ok(SubscriptionClientSet {
            subscription_id: subscription_id.to_string(),
            route_tables: RouteTablesClient::new(subscription_id, plane.clone())?,
            routes: RoutesClient::new(subscription_id, plane.clone())?,
            virtual_networks: VirtualNetworksClient::new(subscription_id, plane.clone())?,
            vnet_peerings: VirtualNetworkPeeringsClient::new(subscription_id, plane)?,
        })
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn route_tables(&self) -> &RouteTablesClient {
        &self.route_tables
    }

    pub fn routes(&self) -> &RoutesClient {
        &self.routes
    }

    pub fn virtual_networks(&self) -> &VirtualNetworksClient {
        &self.virtual_networks
    }

    pub fn vnet_peerings(&self) -> &VirtualNetworkPeeringsClient {
        &self.vnet_peerings
    }
}

/// Client sets keyed by subscription id (case-insensitive).
#[derive(Debug, Clone, Default)]
pub struct SubscriptionClients {
    sets: HashMap<String, SubscriptionClientSet>,
}

impl SubscriptionClients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a set, replacing any previous set for the same subscription.
    pub fn insert(&mut self, set: SubscriptionClientSet) {
        self.sets
            .insert(set.subscription_id().to_ascii_lowercase(), set);
    }

    pub fn get(&self, subscription_id: &str) -> Result<&SubscriptionClientSet> {
        self.sets
            .get(&subscription_id.to_ascii_lowercase())
            .ok_or_else(|| {
                Error::InvalidReference(format!(
                    "no clients were created for subscription '{subscription_id}'"
                ))
            })
    }

    /// Client set of the subscription owning `network`.
    pub fn for_network(&self, network: &NetworkRef) -> Result<&SubscriptionClientSet> {
        self.get(&network.subscription_id)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// Build one client set per distinct subscription, failing on the first error.
pub fn make_clients(
    auth: &AuthContext,
    subscription_ids: &[&str],
    options: &ClientOptions,
) -> Result<SubscriptionClients> {
    let mut clients = SubscriptionClients::new();
    for subscription_id in subscription_ids {
        if clients.get(subscription_id).is_ok() {
            continue;
        }
        clients.insert(SubscriptionClientSet::new(auth, subscription_id, options)?);
    }
    log::info!("created client sets for {} subscription(s)", clients.len());
    Ok(clients)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::StaticToken;

    const SUB1: &str = "11111111-1111-1111-1111-111111111111";
    const SUB2: &str = "22222222-2222-2222-2222-222222222222";

    fn token() -> Arc<dyn TokenSource> {
        Arc::new(StaticToken::new("token"))
    }

    #[test]
    fn test_all_four_clients_share_subscription() {
        let set = SubscriptionClientSet::with_token_source(token(), SUB1, &ClientOptions::default())
            .unwrap();
        assert_eq!(set.subscription_id(), SUB1);
        assert_eq!(set.route_tables().subscription_id, SUB1);
        assert_eq!(set.routes().subscription_id, SUB1);
        assert_eq!(set.virtual_networks().subscription_id, SUB1);
        assert_eq!(set.vnet_peerings().subscription_id, SUB1);
    }

    #[test]
    fn test_invalid_subscription_fails_whole_set() {
        let err = SubscriptionClientSet::with_token_source(
            token(),
            "not-a-subscription",
            &ClientOptions::default(),
        )
        .unwrap_err();
        match err {
            Error::ClientConstruction {
                kind,
                subscription_id,
                ..
            } => {
                assert_eq!(kind, ClientKind::RouteTables);
                assert_eq!(subscription_id, "not-a-subscription");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_bad_endpoint_names_first_client() {
        let options = ClientOptions {
            endpoint: "::not a url::".to_string(),
            ..Default::default()
        };
        let err = SubscriptionClientSet::with_token_source(token(), SUB1, &options).unwrap_err();
        assert!(matches!(
            err,
            Error::ClientConstruction {
                kind: ClientKind::RouteTables,
                ..
            }
        ));
    }

    #[test]
    fn test_subscription_clients_lookup_is_case_insensitive() {
        let mut clients = SubscriptionClients::new();
        clients.insert(
            SubscriptionClientSet::with_token_source(token(), SUB1, &ClientOptions::default())
                .unwrap(),
        );
        assert!(clients.get(&SUB1.to_uppercase()).is_ok());
        assert!(matches!(
            clients.get(SUB2),
            Err(Error::InvalidReference(_))
        ));
        let net = NetworkRef::new(SUB1, "hub-rg", "hub-vnet");
        assert_eq!(clients.for_network(&net).unwrap().subscription_id(), SUB1);
    }

    #[test]
    fn test_make_clients_dedups_subscriptions() {
        let auth = AuthContext::new(SUB1, SUB2, "secret").unwrap();
        let clients = make_clients(&auth, &[SUB1, SUB2, SUB1], &ClientOptions::default()).unwrap();
        assert_eq!(clients.len(), 2);
    }
}
