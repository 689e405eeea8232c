//! Domain models for cross-subscription network reconciliation.
//!
//! - [`resource_id`] - Fully-qualified resource identifier builder
//! - [`NetworkRef`] and [`VirtualNetwork`] - Virtual network references and read model
//! - [`PeeringRequest`] and [`PeeringResult`] - Virtual network peering
//! - [`RouteSpec`], [`RouteTableResult`] and [`RouteResult`] - Route tables and routes

mod network;
mod peering;
pub mod resource_id;
mod route;

// Re-export public types
pub use network::{
    AddressSpace, NetworkRef, RouteTableRef, SubResource, Subnet, SubnetProperties,
    VirtualNetwork, VirtualNetworkProperties,
};
pub use peering::{
    PeeringOptions, PeeringProperties, PeeringRequest, PeeringResult, VirtualNetworkPeering,
};
pub use route::{
    NextHopType, Route, RouteProperties, RouteResult, RouteSpec, RouteTable,
    RouteTableProperties, RouteTableResult, DEFAULT_ADDRESS_PREFIX,
};
