// cargo watch -x 'fmt' -x 'run'

pub mod azure;
pub mod config;
mod error;
pub mod models;
pub mod operation;
pub mod output;
pub mod reconcile;

pub use error::{ClientKind, Error, Result};

use azure::{make_clients, AuthContext, ClientOptions, SubscriptionClients};
use config::{Config, RouteSettings};
use models::{
    NetworkRef, PeeringOptions, RouteResult, RouteSpec, RouteTableRef, RouteTableResult,
    VirtualNetwork,
};
use operation::CancelSignal;
use reconcile::{establish_hub_spoke_peering, upsert_route, upsert_route_table, PeeringOutcome};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

/// Everything a run reconciled.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub peering: PeeringOutcome,
    pub route_table: Option<RouteTableResult>,
    pub route: Option<RouteResult>,
}

/// Hub and spoke networks named by the configuration.
pub fn networks(config: &Config) -> Result<(NetworkRef, NetworkRef)> {
    let hub = NetworkRef::new(
        &config.subscription_id,
        &config.hub_rg_name,
        &config.hub_vnet_name,
    );
    let spoke = NetworkRef::new(
        &config.remote_subscription_id,
        &config.spoke_rg_name,
        &config.spoke_vnet_name,
    );
    hub.resource_id()?;
    spoke.resource_id()?;
    Ok((hub, spoke))
}

/// Authenticate and build one client set per subscription in the configuration.
pub fn build_clients(config: &Config) -> Result<SubscriptionClients> {
    let auth = AuthContext::with_authority(
        &config.tenant_id,
        &config.client_id,
        &config.client_secret,
        &config.authority_host,
    )?;
    let options = ClientOptions {
        endpoint: config.arm_endpoint.clone(),
        poll_frequency: config.poll_interval,
    };
    make_clients(
        &auth,
        &[
            config.subscription_id.as_str(),
            config.remote_subscription_id.as_str(),
        ],
        &options,
    )
}

/// Peer hub and spoke in both directions, then reconcile the spoke default
/// route when one is configured.
///
/// Every request and every long-running operation is bounded by its own
/// `config.operation_timeout` and by `shutdown`; nothing is submitted once
/// `shutdown` has fired.
/// The first failure ends the run; route reconciliation never starts after a
/// peering failure.
pub async fn run(config: &Config, shutdown: &CancellationToken) -> Result<RunReport> {
    log::info!("#Start run() {:?}", config);
    let (hub, spoke) = networks(config)?;
    let clients = build_clients(config)?;
    run_with_clients(config, &clients, &hub, &spoke, shutdown).await
}

/// [`run`] against already built clients.
pub async fn run_with_clients(
    config: &Config,
    clients: &SubscriptionClients,
    hub: &NetworkRef,
    spoke: &NetworkRef,
    shutdown: &CancellationToken,
) -> Result<RunReport> {
    let signal =
        || CancelSignal::from_token(shutdown.child_token()).and_timeout(config.operation_timeout);

    if config.preflight {
        for network in [hub, spoke] {
            let vnet = get_vnet(clients, network, &signal()).await?;
            log::info!("preflight: found {vnet}");
        }
    }

    let peering = establish_hub_spoke_peering(
        clients,
        hub,
        spoke,
        &config.peering_names,
        &PeeringOptions::default(),
        config.failure_policy,
        &signal,
    )
    .await?;
    output::print_peering_outcome(&hub.vnet_name, &spoke.vnet_name, &peering);
    peering.clone().into_result()?;

    let mut report = RunReport {
        peering,
        route_table: None,
        route: None,
    };
    if let Some(route) = &config.route {
        let (table, route) = reconcile_spoke_route(config, clients, spoke, route, &signal).await?;
        println!("{}", output::format_route_table(&table));
        println!("{}", output::format_route(&route));
        report.route_table = Some(table);
        report.route = Some(route);
    } else {
        log::info!("SPOKE_ROUTE_NEXT_HOP_IP not set, skipping route reconciliation");
    }
    Ok(report)
}

async fn get_vnet(
    clients: &SubscriptionClients,
    network: &NetworkRef,
    signal: &CancelSignal,
) -> Result<VirtualNetwork> {
    let operation = format!("get virtual network '{}'", network.vnet_name);
    signal
        .race(
            &operation,
            clients
                .for_network(network)?
                .virtual_networks()
                .get(&network.resource_group, &network.vnet_name),
        )
        .await
}

async fn reconcile_spoke_route(
    config: &Config,
    clients: &SubscriptionClients,
    spoke: &NetworkRef,
    settings: &RouteSettings,
    signal: &impl Fn() -> CancelSignal,
) -> Result<(RouteTableResult, RouteResult)> {
    let spoke_clients = clients.for_network(spoke)?;
    let location = match &settings.location {
        Some(location) => location.clone(),
        None => get_vnet(clients, spoke, &signal()).await?.location,
    };
    let table_ref = RouteTableRef::new(&spoke.resource_group, &config.spoke_route_table_name);
    let tags = BTreeMap::from([("site".to_string(), "test".to_string())]);
    let table = upsert_route_table(
        spoke_clients,
        &table_ref.resource_group,
        &table_ref.route_table_name,
        &location,
        &tags,
        &signal(),
    )
    .await?;
    let spec = RouteSpec::virtual_appliance(
        &settings.route_name,
        &settings.address_prefix,
        &settings.next_hop_ip,
    );
    let route = upsert_route(spoke_clients, &table_ref, &spec, &signal()).await?;
    Ok((table, route))
}
