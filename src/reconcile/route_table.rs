//! Route table and route reconciliation.

use crate::azure::SubscriptionClientSet;
use crate::error::Result;
use crate::models::{RouteResult, RouteSpec, RouteTableRef, RouteTableResult};
use crate::operation::CancelSignal;
use std::collections::BTreeMap;

/// Create or update a route table in the client set's subscription.
pub async fn upsert_route_table(
    clients: &SubscriptionClientSet,
    resource_group: &str,
    route_table_name: &str,
    location: &str,
    tags: &BTreeMap<String, String>,
    signal: &CancelSignal,
) -> Result<RouteTableResult> {
    log::info!("route table '{route_table_name}' in '{resource_group}' ({location})");
    let operation = format!("create route table '{route_table_name}' in '{resource_group}'");
    let mut poller = signal
        .race(
            &operation,
            clients
                .route_tables()
                .begin_create_or_update(resource_group, route_table_name, location, tags),
        )
        .await?;
    Ok(RouteTableResult::from(poller.poll_until_done(signal).await?))
}

/// Create or update one route; its id is derived from `route_table`.
pub async fn upsert_route(
    clients: &SubscriptionClientSet,
    route_table: &RouteTableRef,
    route: &RouteSpec,
    signal: &CancelSignal,
) -> Result<RouteResult> {
    log::info!(
        "route '{}' {} -> {} {}",
        route.name,
        route.address_prefix,
        route.next_hop_type,
        route.next_hop_ip_address.as_deref().unwrap_or("")
    );
    let operation = format!(
        "create route '{}' in route table '{}'",
        route.name, route_table.route_table_name
    );
    let mut poller = signal
        .race(
            &operation,
            clients.routes().begin_create_or_update(
                &route_table.resource_group,
                &route_table.route_table_name,
                route,
            ),
        )
        .await?;
    Ok(RouteResult::from(poller.poll_until_done(signal).await?))
}
