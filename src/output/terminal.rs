//! Terminal output for reconciliation results.

use crate::models::{PeeringResult, RouteResult, RouteTableResult};
use crate::reconcile::{DirectionOutcome, PeeringOutcome};
use colored::{ColoredString, Colorize};

/// Colour a remote state: green when settled well, red when broken.
pub fn color_state(state: &str) -> ColoredString {
    match state {
        "Succeeded" | "Connected" | "FullyInSync" => state.green(),
        "Failed" | "Disconnected" | "Canceled" => state.red(),
        _ => state.yellow(),
    }
}

/// One line per completed peering direction.
pub fn format_peering(local_vnet: &str, remote_vnet: &str, peering: &PeeringResult) -> String {
    format!(
        "Peering response from {local_vnet} to {remote_vnet} details: ID {id}, Name {name}, PeeringState: {state}, PeeringSyncLevel: {sync}, Provisioning State: {prov}",
        id = peering.id,
        name = peering.name,
        state = color_state(&peering.peering_state),
        sync = color_state(&peering.peering_sync_level),
        prov = color_state(&peering.provisioning_state),
    )
}

fn format_direction(local_vnet: &str, remote_vnet: &str, outcome: &DirectionOutcome) -> String {
    match outcome {
        DirectionOutcome::Completed(peering) => format_peering(local_vnet, remote_vnet, peering),
        DirectionOutcome::Failed(e) => format!(
            "Peering from {local_vnet} to {remote_vnet} {}: {e}",
            "FAILED".on_red()
        ),
        DirectionOutcome::Skipped(_) => format!(
            "Peering from {local_vnet} to {remote_vnet} {}",
            "SKIPPED".yellow()
        ),
    }
}

/// Print both directions of a hub/spoke peering.
pub fn print_peering_outcome(hub_vnet: &str, spoke_vnet: &str, outcome: &PeeringOutcome) {
    println!(
        "{}\n",
        format_direction(hub_vnet, spoke_vnet, &outcome.hub_to_spoke)
    );
    println!(
        "{}\n",
        format_direction(spoke_vnet, hub_vnet, &outcome.spoke_to_hub)
    );
    if !outcome.is_symmetric() {
        println!(
            "#{}# peering between {hub_vnet} and {spoke_vnet} is asymmetric, fix the failed direction and re-run",
            "WARN".on_red()
        );
    }
}

pub fn format_route_table(table: &RouteTableResult) -> String {
    let tags: Vec<String> = table.tags.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!(
        "Route table {name} ({location}) tags [{tags}]: ID {id}, Provisioning State: {prov}",
        name = table.name,
        location = table.location,
        tags = tags.join(", "),
        id = table.id,
        prov = color_state(&table.provisioning_state),
    )
}

pub fn format_route(route: &RouteResult) -> String {
    format!(
        "Route {name} {prefix} -> {hop}{ip}: ID {id}, Provisioning State: {prov}",
        name = route.name,
        prefix = route.address_prefix,
        hop = route
            .next_hop_type
            .map(|t| t.to_string())
            .unwrap_or_else(|| "None".to_string()),
        ip = route
            .next_hop_ip_address
            .as_deref()
            .map(|ip| format!(" {ip}"))
            .unwrap_or_default(),
        id = route.id,
        prov = color_state(&route.provisioning_state),
    )
}
