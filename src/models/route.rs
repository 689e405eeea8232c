//! Route table and route types.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Default prefix for a catch-all route.
pub const DEFAULT_ADDRESS_PREFIX: &str = "0.0.0.0/0";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextHopType {
    VirtualNetworkGateway,
    VnetLocal,
    Internet,
    VirtualAppliance,
    None,
}

impl fmt::Display for NextHopType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NextHopType::VirtualNetworkGateway => "VirtualNetworkGateway",
            NextHopType::VnetLocal => "VnetLocal",
            NextHopType::Internet => "Internet",
            NextHopType::VirtualAppliance => "VirtualAppliance",
            NextHopType::None => "None",
        };
        f.write_str(s)
    }
}

/// Caller-side description of a route. The route id is never supplied here;
/// it is derived from the owning route table when the route is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub name: String,
    pub next_hop_type: NextHopType,
    pub address_prefix: String,
    pub next_hop_ip_address: Option<String>,
}

impl RouteSpec {
    /// Route to a network virtual appliance, the shape the run uses for the
    /// spoke default route.
    pub fn virtual_appliance(
        name: impl Into<String>,
        address_prefix: impl Into<String>,
        next_hop_ip_address: impl Into<String>,
    ) -> Self {
        RouteSpec {
            name: name.into(),
            next_hop_type: NextHopType::VirtualAppliance,
            address_prefix: address_prefix.into(),
            next_hop_ip_address: Some(next_hop_ip_address.into()),
        }
    }

    /// Next-hop IP is required for `VirtualAppliance` and forbidden otherwise.
    pub fn validate(&self) -> Result<()> {
        if self.address_prefix.trim().is_empty() {
            return Err(Error::InvalidReference(format!(
                "route '{}' has an empty address prefix",
                self.name
            )));
        }
        let has_ip = self
            .next_hop_ip_address
            .as_deref()
            .is_some_and(|ip| !ip.trim().is_empty());
        match (self.next_hop_type, has_ip) {
            (NextHopType::VirtualAppliance, false) => Err(Error::InvalidReference(format!(
                "route '{}' uses VirtualAppliance but has no next hop IP address",
                self.name
            ))),
            (kind, true) if kind != NextHopType::VirtualAppliance => {
                Err(Error::InvalidReference(format!(
                    "route '{}' sets a next hop IP address for next hop type {kind}",
                    self.name
                )))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn to_resource(&self, route_id: String) -> Route {
        Route {
            id: Some(route_id),
            name: Some(self.name.clone()),
            properties: RouteProperties {
                next_hop_type: Some(self.next_hop_type),
                address_prefix: Some(self.address_prefix.clone()),
                next_hop_ip_address: self.next_hop_ip_address.clone(),
                provisioning_state: None,
            },
        }
    }
}

/// `Microsoft.Network/routeTables/routes` resource.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Route {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: RouteProperties,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteProperties {
    pub next_hop_type: Option<NextHopType>,
    pub address_prefix: Option<String>,
    #[serde(
        rename = "nextHopIpAddress",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_hop_ip_address: Option<String>,
    #[serde(skip_serializing)]
    pub provisioning_state: Option<String>,
}

/// `Microsoft.Network/routeTables` resource.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RouteTable {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub properties: RouteTableProperties,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteTableProperties {
    #[serde(skip_serializing)]
    pub provisioning_state: Option<String>,
    #[serde(default, skip_serializing)]
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTableResult {
    pub id: String,
    pub name: String,
    pub location: String,
    pub tags: BTreeMap<String, String>,
    pub provisioning_state: String,
}

impl From<RouteTable> for RouteTableResult {
    fn from(t: RouteTable) -> Self {
        RouteTableResult {
            id: t.id.unwrap_or_default(),
            name: t.name.unwrap_or_default(),
            location: t.location.unwrap_or_default(),
            tags: t.tags,
            provisioning_state: t
                .properties
                .provisioning_state
                .unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteResult {
    pub id: String,
    pub name: String,
    pub address_prefix: String,
    pub next_hop_type: Option<NextHopType>,
    pub next_hop_ip_address: Option<String>,
    pub provisioning_state: String,
}

impl From<Route> for RouteResult {
    fn from(r: Route) -> Self {
        RouteResult {
            id: r.id.unwrap_or_default(),
            name: r.name.unwrap_or_default(),
            address_prefix: r.properties.address_prefix.unwrap_or_default(),
            next_hop_type: r.properties.next_hop_type,
            next_hop_ip_address: r.properties.next_hop_ip_address,
            provisioning_state: r
                .properties
                .provisioning_state
                .unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_route_body_shape() {
        let spec = RouteSpec::virtual_appliance("def-route", DEFAULT_ADDRESS_PREFIX, "10.10.11.2");
        let body = serde_json::to_value(spec.to_resource("/x/routes/def-route".to_string())).unwrap();
        assert_eq!(
            body,
            json!({
                "id": "/x/routes/def-route",
                "name": "def-route",
                "properties": {
                    "nextHopType": "VirtualAppliance",
                    "addressPrefix": "0.0.0.0/0",
                    "nextHopIpAddress": "10.10.11.2"
                }
            })
        );
    }

    #[test]
    fn test_validate_virtual_appliance_needs_ip() {
        let mut spec = RouteSpec::virtual_appliance("r", "0.0.0.0/0", "10.0.0.4");
        assert!(spec.validate().is_ok());
        spec.next_hop_ip_address = None;
        assert!(matches!(spec.validate(), Err(Error::InvalidReference(_))));
    }

    #[test]
    fn test_validate_ip_only_for_virtual_appliance() {
        let spec = RouteSpec {
            name: "r".to_string(),
            next_hop_type: NextHopType::Internet,
            address_prefix: "0.0.0.0/0".to_string(),
            next_hop_ip_address: Some("10.0.0.4".to_string()),
        };
        assert!(spec.validate().is_err());
        let spec = RouteSpec {
            next_hop_ip_address: None,
            ..spec
        };
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_route_table_result_from_arm_json() {
        let t: RouteTable = serde_json::from_value(json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/routeTables/rt",
            "name": "rt",
            "location": "westeurope",
            "tags": { "site": "test" },
            "properties": { "provisioningState": "Succeeded", "routes": [] }
        }))
        .unwrap();
        let r = RouteTableResult::from(t);
        assert_eq!(r.provisioning_state, "Succeeded");
        assert_eq!(r.tags.get("site").map(String::as_str), Some("test"));
    }
}
