//! Azure authentication and Resource Manager access.
//!
//! - [`credential`] - Service principal credential and token sources
//! - [`arm`] - ARM REST transport implementing the control plane
//! - [`clients`] - Per-subscription typed clients and the client factory

mod arm;
mod clients;
mod credential;

// Re-export public types and functions
pub use arm::{ArmClient, DEFAULT_ARM_ENDPOINT, NETWORK_API_VERSION, REQUEST_TIMEOUT};
pub use clients::{
    make_clients, ClientOptions, RouteTablesClient, RoutesClient, SubscriptionClientSet,
    SubscriptionClients, VirtualNetworkPeeringsClient, VirtualNetworksClient,
};
pub use credential::{AuthContext, StaticToken, TokenSource, ARM_SCOPE, DEFAULT_AUTHORITY_HOST};
