//! Submission and polling of a single long-running operation.

use super::{CancelSignal, ControlPlane, OperationHandle, PollStatus, PutRequest};
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Submit `request` and return a [`Poller`] for the accepted operation.
///
/// # Returns
/// * `Ok(Poller)` - The service accepted the mutation
/// * `Err(Error::RequestRejected)` - The service refused it synchronously
pub async fn begin<T>(plane: Arc<dyn ControlPlane>, request: PutRequest) -> Result<Poller<T>>
where
    T: DeserializeOwned + Clone,
{
    log::debug!("begin: {} (PUT {})", request.operation, request.resource_id);
    let handle = plane.begin_create_or_update(request).await?;
    log::info!(
        "accepted: {} [monitor={}]",
        handle.operation,
        handle.monitor
    );
    Ok(Poller::new(plane, handle))
}

/// Drives one [`OperationHandle`] to its terminal result.
///
/// The terminal result is remembered, so awaiting an already finished poller
/// returns the same value again without touching the service.
pub struct Poller<T> {
    plane: Arc<dyn ControlPlane>,
    handle: OperationHandle,
    frequency: Duration,
    last: PollStatus,
    polls: u32,
    terminal: Option<Result<T>>,
}

impl<T> Poller<T>
where
    T: DeserializeOwned + Clone,
{
    pub fn new(plane: Arc<dyn ControlPlane>, handle: OperationHandle) -> Self {
        let frequency = plane.poll_frequency();
        let last = handle.initial.clone();
        Poller {
            plane,
            handle,
            frequency,
            last,
            polls: 0,
            terminal: None,
        }
    }

    /// Override the wait between polls when the service sends no `Retry-After`.
    pub fn with_frequency(mut self, frequency: Duration) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn handle(&self) -> &OperationHandle {
        &self.handle
    }

    /// Number of status requests issued so far.
    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub fn is_done(&self) -> bool {
        self.terminal.is_some()
    }

    /// Wait until the operation succeeds or fails, or until `signal` fires.
    ///
    /// On cancellation the remote operation is left running and its outcome
    /// is unobserved; calling again resumes polling from the last status.
    pub async fn poll_until_done(&mut self, signal: &CancelSignal) -> Result<T> {
        if let Some(done) = &self.terminal {
            return done.clone();
        }
        let operation = self.handle.operation.clone();
        if signal.is_fired() {
            log::warn!("cancelled: {operation} (signal fired before polling)");
            return Err(cancelled(&operation));
        }

        loop {
            match self.last.clone() {
                PollStatus::InProgress { retry_after } => {
                    let delay = retry_after.unwrap_or(self.frequency);
                    log::trace!("{operation}: in progress, next poll in {delay:?}");
                    tokio::select! {
                        biased;
                        _ = signal.fired() => {
                            log::warn!("cancelled: {operation} after {} polls", self.polls);
                            return Err(cancelled(&operation));
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    let status = tokio::select! {
                        biased;
                        _ = signal.fired() => None,
                        status = self.plane.poll(&self.handle) => Some(status),
                    };
                    let Some(status) = status else {
                        log::warn!("cancelled: {operation} while polling");
                        return Err(cancelled(&operation));
                    };
                    self.polls += 1;
                    self.last = status?;
                    log::debug!("{operation}: poll #{} -> {:?}", self.polls, short(&self.last));
                }
                PollStatus::Succeeded(body) => {
                    log::info!("succeeded: {operation} after {} polls", self.polls);
                    let result = decode(&operation, body);
                    self.terminal = Some(result.clone());
                    return result;
                }
                PollStatus::Failed { code, message } => {
                    log::warn!("failed: {operation}: {message}");
                    let result = Err(Error::OperationFailed {
                        operation,
                        code,
                        message,
                    });
                    self.terminal = Some(result.clone());
                    return result;
                }
            }
        }
    }
}

fn cancelled(operation: &str) -> Error {
    Error::OperationCancelled {
        operation: operation.to_string(),
    }
}

fn short(status: &PollStatus) -> &'static str {
    match status {
        PollStatus::InProgress { .. } => "InProgress",
        PollStatus::Succeeded(_) => "Succeeded",
        PollStatus::Failed { .. } => "Failed",
    }
}

pub(crate) fn decode<T: DeserializeOwned>(operation: &str, body: Value) -> Result<T> {
    serde_path_to_error::deserialize(body).map_err(|e| Error::Transport {
        operation: operation.to_string(),
        message: format!(
            "unexpected resource representation: path={} error={}",
            e.path(),
            e
        ),
    })
}
