//! Reconcilers built on the long-running operation orchestrator.
//!
//! - [`peering`] - Virtual network peerings, single and hub/spoke pairs
//! - [`route_table`] - Route tables and routes

mod peering;
mod route_table;

pub use peering::{
    establish_hub_spoke_peering, reconcile_peering, DirectionOutcome, FailurePolicy,
    PeeringNames, PeeringOutcome,
};
pub use route_table::{upsert_route, upsert_route_table};
