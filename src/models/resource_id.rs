//! Fully-qualified Azure resource identifiers.
//!
//! Cross-subscription operations must reference resources by absolute
//! identifier, never by local name. Every identifier in the crate is built
//! here from its subscription / resource-group / name components.

use crate::error::{Error, Result};

const PROVIDER: &str = "Microsoft.Network";

/// `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Network/virtualNetworks/{vnet}`
pub fn vnet_id(subscription_id: &str, resource_group: &str, vnet_name: &str) -> Result<String> {
    check("subscription id", subscription_id)?;
    check("resource group", resource_group)?;
    check("virtual network name", vnet_name)?;
    Ok(format!(
        "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/{PROVIDER}/virtualNetworks/{vnet_name}"
    ))
}

/// Identifier of a peering owned by the given virtual network.
pub fn peering_id(
    subscription_id: &str,
    resource_group: &str,
    vnet_name: &str,
    peering_name: &str,
) -> Result<String> {
    check("peering name", peering_name)?;
    Ok(format!(
        "{}/virtualNetworkPeerings/{peering_name}",
        vnet_id(subscription_id, resource_group, vnet_name)?
    ))
}

pub fn route_table_id(
    subscription_id: &str,
    resource_group: &str,
    route_table_name: &str,
) -> Result<String> {
    check("subscription id", subscription_id)?;
    check("resource group", resource_group)?;
    check("route table name", route_table_name)?;
    Ok(format!(
        "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/{PROVIDER}/routeTables/{route_table_name}"
    ))
}

/// `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Network/routeTables/{rt}/routes/{route}`
pub fn route_id(
    subscription_id: &str,
    resource_group: &str,
    route_table_name: &str,
    route_name: &str,
) -> Result<String> {
    check("route name", route_name)?;
    Ok(format!(
        "{}/routes/{route_name}",
        route_table_id(subscription_id, resource_group, route_table_name)?
    ))
}

/// Extract the subscription segment of an absolute identifier.
///
/// The `subscriptions` segment name is matched case-insensitively, as ARM
/// does when it echoes identifiers back.
pub fn parse_subscription_id(resource_id: &str) -> Result<&str> {
    let mut segments = resource_id.split('/');
    if segments.next() != Some("") {
        return Err(Error::InvalidReference(format!(
            "'{resource_id}' is not an absolute resource identifier"
        )));
    }
    match (segments.next(), segments.next()) {
        (Some(key), Some(sub)) if key.eq_ignore_ascii_case("subscriptions") && !sub.is_empty() => {
            Ok(sub)
        }
        _ => Err(Error::InvalidReference(format!(
            "'{resource_id}' has no subscription segment"
        ))),
    }
}

/// Reject empty components and components containing the path separator.
///
/// With `/` excluded every component occupies exactly one path segment, so
/// distinct tuples can never format to the same identifier.
fn check(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidReference(format!("{what} must not be empty")));
    }
    if value.contains('/') {
        return Err(Error::InvalidReference(format!(
            "{what} '{value}' must not contain '/'"
        )));
    }
    Ok(())
}
