//! Status handlers: how a fetched status translates into continue/done/fatal

use crate::types::{ResourceStatus, StatusResponse};

/// Remote statuses from which a resource never recovers on its own
pub const FATAL_STATUSES: &[&str] = &["FAILED", "ERROR"];

/// Result of evaluating one status fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Not there yet; an optional transient message to surface
    Continue(Option<String>),
    /// Terminal success
    Done,
    /// Terminal failure
    Fatal(String),
}

/// Domain logic plugged into the waiter
pub trait WaitHandler<R>: Send {
    /// Evaluate one freshly fetched status
    fn evaluate(&mut self, response: &StatusResponse<R>) -> WaitOutcome;

    /// Progress line for display, e.g. `status: CONFIGURING`
    fn message(&self) -> String;
}

/// Waits until a resource reports `target`
///
/// Fails on a fatal status, on 404 (the resource was deleted from under us)
/// and on any non-5xx error code. 5xx responses are treated as transient.
#[derive(Debug, Clone)]
pub struct ReachStatusHandler {
    target: String,
    fatal: Vec<String>,
    last_status: Option<String>,
}

impl ReachStatusHandler {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            fatal: FATAL_STATUSES.iter().map(|s| s.to_string()).collect(),
            last_status: None,
        }
    }

    /// Replace the default fatal set
    pub fn with_fatal_statuses<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fatal = statuses.into_iter().map(Into::into).collect();
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl<R: ResourceStatus> WaitHandler<R> for ReachStatusHandler {
    fn evaluate(&mut self, response: &StatusResponse<R>) -> WaitOutcome {
        if response.is_server_error() {
            return WaitOutcome::Continue(Some(format!(
                "server error ({}), retrying",
                response.status_code
            )));
        }
        if response.is_not_found() {
            return WaitOutcome::Fatal(
                "resource no longer exists; it may have been deleted".to_string(),
            );
        }
        if !response.is_success() {
            return WaitOutcome::Fatal(format!(
                "unexpected response status {}",
                response.status_code
            ));
        }

        let Some(status) = response.body.as_ref().and_then(|b| b.status()) else {
            return WaitOutcome::Continue(None);
        };
        self.last_status = Some(status.to_string());

        if status.eq_ignore_ascii_case(&self.target) {
            WaitOutcome::Done
        } else if self.fatal.iter().any(|f| status.eq_ignore_ascii_case(f)) {
            WaitOutcome::Fatal(format!("resource entered {} state", status))
        } else {
            WaitOutcome::Continue(None)
        }
    }

    fn message(&self) -> String {
        match &self.last_status {
            Some(status) => format!("status: {}", status),
            None => format!("waiting for status {}", self.target),
        }
    }
}

/// Waits until a resource is gone (404)
#[derive(Debug, Clone, Default)]
pub struct ReachAbsenceHandler {
    last_status: Option<String>,
}

impl ReachAbsenceHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: ResourceStatus> WaitHandler<R> for ReachAbsenceHandler {
    fn evaluate(&mut self, response: &StatusResponse<R>) -> WaitOutcome {
        if response.is_not_found() {
            WaitOutcome::Done
        } else if response.is_server_error() {
            WaitOutcome::Continue(Some(format!(
                "server error ({}), retrying",
                response.status_code
            )))
        } else if response.is_success() {
            self.last_status = response
                .body
                .as_ref()
                .and_then(|b| b.status())
                .map(str::to_string);
            WaitOutcome::Continue(None)
        } else {
            WaitOutcome::Fatal(format!(
                "unexpected response status {}",
                response.status_code
            ))
        }
    }

    fn message(&self) -> String {
        match &self.last_status {
            Some(status) => format!("status: {}", status),
            None => "waiting for deletion".to_string(),
        }
    }
}
