//! Virtual network peering reconciliation.
//!
//! A peering is one-directional on the Azure side, so a hub/spoke pair needs
//! two independent long-running operations, each submitted with the client
//! set of the subscription that owns the local network.

use crate::azure::{SubscriptionClientSet, SubscriptionClients};
use crate::error::{Error, Result};
use crate::models::{NetworkRef, PeeringOptions, PeeringRequest, PeeringResult};
use crate::operation::CancelSignal;
use std::fmt;

/// Create or update the peering `peering_name` on `local` pointing at `remote`.
///
/// `remote` may live in another subscription; it is always referenced by its
/// absolute identifier. Submitting the same request again updates the
/// existing peering.
///
/// # Returns
/// * `Ok(PeeringResult)` - The peering reached a terminal successful state
/// * `Err` - Rejected, failed remotely, or `signal` fired first
pub async fn reconcile_peering(
    clients: &SubscriptionClientSet,
    local: &NetworkRef,
    peering_name: &str,
    remote: &NetworkRef,
    options: &PeeringOptions,
    signal: &CancelSignal,
) -> Result<PeeringResult> {
    let request = PeeringRequest {
        local: local.clone(),
        peering_name: peering_name.to_string(),
        remote: remote.clone(),
        remote_vnet_id: remote.resource_id()?,
        options: options.clone(),
    };
    log::info!(
        "peering '{peering_name}': {} -> {}",
        local.vnet_name,
        request.remote_vnet_id
    );
    let operation = format!(
        "create virtual network peering '{peering_name}' from '{}' to '{}'",
        local.vnet_name, remote.vnet_name
    );
    let mut poller = signal
        .race(
            &operation,
            clients.vnet_peerings().begin_create_or_update(&request),
        )
        .await?;
    let peering = poller.poll_until_done(signal).await?;
    Ok(PeeringResult::from(peering))
}

/// What to do with the second direction when the first one fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Run hub→spoke, then spoke→hub only if the first succeeded.
    #[default]
    AbortOnFirstError,
    /// Run both directions concurrently and report each result.
    ContinueIndependent,
}

impl std::str::FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::AbortOnFirstError),
            "continue" => Ok(FailurePolicy::ContinueIndependent),
            other => Err(Error::Config(format!(
                "FAILURE_POLICY must be 'abort' or 'continue', got '{other}'"
            ))),
        }
    }
}

/// Names of the two peerings of a hub/spoke pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeeringNames {
    pub hub_to_spoke: String,
    pub spoke_to_hub: String,
}

impl Default for PeeringNames {
    fn default() -> Self {
        PeeringNames {
            hub_to_spoke: "peer-137749".to_string(),
            spoke_to_hub: "peer-237749".to_string(),
        }
    }
}

/// Result of one peering direction.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectionOutcome {
    Completed(PeeringResult),
    Failed(Error),
    /// Not attempted because an earlier direction failed with this error.
    Skipped(Error),
}

impl DirectionOutcome {
    fn from_result(result: Result<PeeringResult>) -> Self {
        match result {
            Ok(peering) => DirectionOutcome::Completed(peering),
            Err(e) => DirectionOutcome::Failed(e),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, DirectionOutcome::Completed(_))
    }

    pub fn result(&self) -> Option<&PeeringResult> {
        match self {
            DirectionOutcome::Completed(peering) => Some(peering),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            DirectionOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for DirectionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectionOutcome::Completed(p) => write!(f, "completed ({})", p.provisioning_state),
            DirectionOutcome::Failed(e) => write!(f, "failed: {e}"),
            DirectionOutcome::Skipped(cause) => write!(f, "skipped after: {cause}"),
        }
    }
}

/// Both directions of a hub/spoke peering. Asymmetric outcomes are reported,
/// never rolled back.
#[derive(Debug, Clone, PartialEq)]
pub struct PeeringOutcome {
    pub hub_to_spoke: DirectionOutcome,
    pub spoke_to_hub: DirectionOutcome,
}

impl PeeringOutcome {
    pub fn is_symmetric(&self) -> bool {
        self.hub_to_spoke.is_completed() && self.spoke_to_hub.is_completed()
    }

    /// Both results, or the first error (hub→spoke first).
    pub fn into_result(self) -> Result<(PeeringResult, PeeringResult)> {
        match (self.hub_to_spoke, self.spoke_to_hub) {
            (DirectionOutcome::Completed(a), DirectionOutcome::Completed(b)) => Ok((a, b)),
            (DirectionOutcome::Failed(e), _)
            | (DirectionOutcome::Skipped(e), _)
            | (_, DirectionOutcome::Failed(e))
            | (_, DirectionOutcome::Skipped(e)) => Err(e),
        }
    }
}

/// Peer `hub` and `spoke` in both directions.
///
/// # Arguments
/// * `clients` - Must hold a client set for both networks' subscriptions
/// * `policy` - Whether a hub→spoke failure stops the spoke→hub direction
/// * `new_signal` - Called once per direction, right before it starts, so
///   each direction gets its own deadline
pub async fn establish_hub_spoke_peering<S>(
    clients: &SubscriptionClients,
    hub: &NetworkRef,
    spoke: &NetworkRef,
    names: &PeeringNames,
    options: &PeeringOptions,
    policy: FailurePolicy,
    new_signal: S,
) -> Result<PeeringOutcome>
where
    S: Fn() -> CancelSignal,
{
    // Resolve everything up front so reference errors abort before any mutation.
    let hub_clients = clients.for_network(hub)?;
    let spoke_clients = clients.for_network(spoke)?;
    hub.resource_id()?;
    spoke.resource_id()?;

    let hub_to_spoke = |signal: CancelSignal| async move {
        reconcile_peering(hub_clients, hub, &names.hub_to_spoke, spoke, options, &signal).await
    };
    let spoke_to_hub = |signal: CancelSignal| async move {
        reconcile_peering(spoke_clients, spoke, &names.spoke_to_hub, hub, options, &signal).await
    };

    let outcome = match policy {
        FailurePolicy::AbortOnFirstError => {
            let first = DirectionOutcome::from_result(hub_to_spoke(new_signal()).await);
            let second = match first.error() {
                None => DirectionOutcome::from_result(spoke_to_hub(new_signal()).await),
                Some(cause) => {
                    log::warn!(
                        "skipping peering '{}' from {} because the hub direction did not complete",
                        names.spoke_to_hub,
                        spoke.vnet_name
                    );
                    DirectionOutcome::Skipped(cause.clone())
                }
            };
            PeeringOutcome {
                hub_to_spoke: first,
                spoke_to_hub: second,
            }
        }
        FailurePolicy::ContinueIndependent => {
            let (first, second) =
                futures::join!(hub_to_spoke(new_signal()), spoke_to_hub(new_signal()));
            PeeringOutcome {
                hub_to_spoke: DirectionOutcome::from_result(first),
                spoke_to_hub: DirectionOutcome::from_result(second),
            }
        }
    };

    if !outcome.is_symmetric() {
        log::warn!(
            "peering between {} and {} is not symmetric: hub->spoke {}, spoke->hub {}",
            hub.vnet_name,
            spoke.vnet_name,
            outcome.hub_to_spoke,
            outcome.spoke_to_hub
        );
    }
    Ok(outcome)
}
