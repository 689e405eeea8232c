//! Error taxonomy for peering and route reconciliation.
//!
//! Construction-time errors ([`Error::Authentication`], [`Error::ClientConstruction`],
//! [`Error::InvalidReference`], [`Error::Config`]) abort a run before any remote
//! mutation is submitted. Operation-time errors ([`Error::RequestRejected`],
//! [`Error::OperationFailed`], [`Error::OperationCancelled`], [`Error::Transport`])
//! are reported per long-running operation and always name the operation.

use std::fmt;

/// The four typed clients built for every subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientKind {
    RouteTables,
    Routes,
    VirtualNetworks,
    VirtualNetworkPeerings,
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClientKind::RouteTables => "route tables",
            ClientKind::Routes => "routes",
            ClientKind::VirtualNetworks => "virtual networks",
            ClientKind::VirtualNetworkPeerings => "virtual network peerings",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("authentication error: {0}")]
    Authentication(String),

    #[error("failed to create {kind} client for subscription '{subscription_id}': {reason}")]
    ClientConstruction {
        kind: ClientKind,
        subscription_id: String,
        reason: String,
    },

    #[error("invalid resource reference: {0}")]
    InvalidReference(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{operation}: request rejected (HTTP {status}{}): {message}", fmt_code(.code))]
    RequestRejected {
        operation: String,
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("{operation}: operation failed{}: {message}", fmt_code(.code))]
    OperationFailed {
        operation: String,
        code: Option<String>,
        message: String,
    },

    #[error("{operation}: cancelled before the operation reached a terminal state")]
    OperationCancelled { operation: String },

    #[error("{operation}: {message}")]
    Transport { operation: String, message: String },
}

fn fmt_code(code: &Option<String>) -> String {
    match code {
        Some(code) => format!(", {code}"),
        None => String::new(),
    }
}

impl Error {
    /// True for failures that happen before anything is sent to the control plane.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Error::Authentication(_)
                | Error::ClientConstruction { .. }
                | Error::InvalidReference(_)
                | Error::Config(_)
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::OperationCancelled { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
