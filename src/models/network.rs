//! Virtual network references and the virtual-network read model.

use super::resource_id;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical reference to a virtual network in some subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetworkRef {
    pub subscription_id: String,
    pub resource_group: String,
    pub vnet_name: String,
}

impl NetworkRef {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        vnet_name: impl Into<String>,
    ) -> Self {
        NetworkRef {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            vnet_name: vnet_name.into(),
        }
    }

    /// Resolve to the fully-qualified identifier.
    pub fn resource_id(&self) -> Result<String> {
        resource_id::vnet_id(&self.subscription_id, &self.resource_group, &self.vnet_name)
    }
}

impl fmt::Display for NetworkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} (subscription {})",
            self.resource_group, self.vnet_name, self.subscription_id
        )
    }
}

/// A route table inside the subscription of the client set it is used with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteTableRef {
    pub resource_group: String,
    pub route_table_name: String,
}

impl RouteTableRef {
    pub fn new(resource_group: impl Into<String>, route_table_name: impl Into<String>) -> Self {
        RouteTableRef {
            resource_group: resource_group.into(),
            route_table_name: route_table_name.into(),
        }
    }
}

/// Reference by id, as used by ARM for `remoteVirtualNetwork` and `routeTable`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct SubResource {
    pub id: String,
}

/// Virtual network as returned by `GET .../virtualNetworks/{name}`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct VirtualNetwork {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub properties: VirtualNetworkProperties,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkProperties {
    pub address_space: Option<AddressSpace>,
    #[serde(default)]
    pub subnets: Vec<Subnet>,
    pub provisioning_state: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpace {
    #[serde(default)]
    pub address_prefixes: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Subnet {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub properties: SubnetProperties,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubnetProperties {
    pub address_prefix: Option<String>,
    pub route_table: Option<SubResource>,
}

impl VirtualNetwork {
    pub fn address_prefixes(&self) -> &[String] {
        self.properties
            .address_space
            .as_ref()
            .map(|a| a.address_prefixes.as_slice())
            .unwrap_or(&[])
    }
}

impl fmt::Display for VirtualNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] ({} subnets, {})",
            self.name,
            self.address_prefixes().join(", "),
            self.properties.subnets.len(),
            self.location
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_ref_resolves_to_vnet_id() {
        let r = NetworkRef::new("11111111-1111-1111-1111-111111111111", "hub-rg", "hub-vnet");
        assert_eq!(
            r.resource_id().unwrap(),
            "/subscriptions/11111111-1111-1111-1111-111111111111/resourceGroups/hub-rg/providers/Microsoft.Network/virtualNetworks/hub-vnet"
        );
    }

    #[test]
    fn test_virtual_network_from_arm_json() {
        let json = r#"{
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/spoke-vnet",
            "name": "spoke-vnet",
            "location": "australiaeast",
            "properties": {
                "provisioningState": "Succeeded",
                "addressSpace": { "addressPrefixes": ["10.20.0.0/16"] },
                "subnets": [
                    { "name": "app", "properties": {
                        "addressPrefix": "10.20.1.0/24",
                        "routeTable": { "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/routeTables/rt" }
                    } }
                ]
            }
        }"#;
        let vnet: VirtualNetwork = serde_json::from_str(json).unwrap();
        assert_eq!(vnet.location, "australiaeast");
        assert_eq!(vnet.address_prefixes(), ["10.20.0.0/16".to_string()]);
        assert!(vnet.properties.subnets[0].properties.route_table.is_some());
        assert_eq!(
            vnet.to_string(),
            "spoke-vnet [10.20.0.0/16] (1 subnets, australiaeast)"
        );
    }
}
