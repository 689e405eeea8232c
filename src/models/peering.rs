//! Virtual network peering request/result types.

use super::network::{NetworkRef, SubResource};
use serde::{Deserialize, Serialize};

/// Flags applied to a peering; defaults match a hub/spoke topology without
/// gateway sharing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeeringOptions {
    pub allow_forwarded_traffic: bool,
    pub allow_gateway_transit: bool,
    pub allow_virtual_network_access: bool,
    pub use_remote_gateways: bool,
    /// Sent as the `syncRemoteAddressSpace` query parameter.
    pub sync_remote_address_space: bool,
}

impl Default for PeeringOptions {
    fn default() -> Self {
        PeeringOptions {
            allow_forwarded_traffic: true,
            allow_gateway_transit: false,
            allow_virtual_network_access: true,
            use_remote_gateways: false,
            sync_remote_address_space: true,
        }
    }
}

/// One direction of a peering, ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeeringRequest {
    pub local: NetworkRef,
    pub peering_name: String,
    pub remote: NetworkRef,
    /// Absolute id of `remote`, resolved before submission.
    pub remote_vnet_id: String,
    pub options: PeeringOptions,
}

impl PeeringRequest {
    /// ARM request body.
    pub fn to_resource(&self) -> VirtualNetworkPeering {
        VirtualNetworkPeering {
            id: None,
            name: Some(self.peering_name.clone()),
            properties: PeeringProperties {
                allow_forwarded_traffic: Some(self.options.allow_forwarded_traffic),
                allow_gateway_transit: Some(self.options.allow_gateway_transit),
                allow_virtual_network_access: Some(self.options.allow_virtual_network_access),
                use_remote_gateways: Some(self.options.use_remote_gateways),
                remote_virtual_network: Some(SubResource {
                    id: self.remote_vnet_id.clone(),
                }),
                peering_state: None,
                peering_sync_level: None,
                provisioning_state: None,
            },
        }
    }
}

/// `Microsoft.Network/virtualNetworks/virtualNetworkPeerings` resource.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct VirtualNetworkPeering {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: PeeringProperties,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PeeringProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_forwarded_traffic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_gateway_transit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_virtual_network_access: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_remote_gateways: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_virtual_network: Option<SubResource>,
    // Read-only, reported by the service.
    #[serde(skip_serializing)]
    pub peering_state: Option<String>,
    #[serde(skip_serializing)]
    pub peering_sync_level: Option<String>,
    #[serde(skip_serializing)]
    pub provisioning_state: Option<String>,
}

/// Terminal state of a completed peering operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeeringResult {
    pub id: String,
    pub name: String,
    pub peering_state: String,
    pub peering_sync_level: String,
    pub provisioning_state: String,
}

impl From<VirtualNetworkPeering> for PeeringResult {
    fn from(p: VirtualNetworkPeering) -> Self {
        let unknown = || "Unknown".to_string();
        PeeringResult {
            id: p.id.unwrap_or_default(),
            name: p.name.unwrap_or_default(),
            peering_state: p.properties.peering_state.unwrap_or_else(unknown),
            peering_sync_level: p.properties.peering_sync_level.unwrap_or_else(unknown),
            provisioning_state: p.properties.provisioning_state.unwrap_or_else(unknown),
        }
    }
}
