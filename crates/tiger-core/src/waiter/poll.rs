//! The polling loop

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::types::{CancellationToken, StatusResponse};
use super::handlers::{WaitHandler, WaitOutcome};

/// Interval between status fetches
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Shorter intervals are raised to this
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Failure of a single status fetch (transport, decoding, ...)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct FetchError {
    pub message: String,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One remote status query, injected by the caller around its API client
#[async_trait]
pub trait StatusFetcher<R: Send>: Send + Sync {
    async fn fetch(&self) -> Result<StatusResponse<R>, FetchError>;
}

/// Why a wait ended without success
#[derive(Error, Debug)]
pub enum WaitError {
    #[error("{context}: timed out after {}s", timeout.as_secs())]
    Timeout { context: String, timeout: Duration },

    #[error("{context}: canceled")]
    Canceled { context: String },

    #[error("{0}")]
    FatalRemoteState(String),
}

impl WaitError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled { .. })
    }
}

pub type WaitResult<T> = Result<T, WaitError>;

/// Settings for one wait
#[derive(Debug, Clone)]
pub struct WaitConfig {
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Prefix for timeout/cancel errors, e.g. "waiting for service svc-1 to be READY"
    pub context: String,
}

impl WaitConfig {
    pub fn new(context: impl Into<String>, timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
            context: context.into(),
        }
    }

    /// Set the interval, raised to at least [`MIN_POLL_INTERVAL`]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }
}

/// Polls a remote status until a handler says done, fatal, or time runs out
///
/// One instance drives one wait. The current progress line can be read with
/// [`Waiter::message`] or followed through [`Waiter::subscribe`].
///
/// # Example
///
/// ```rust,ignore
/// let waiter = Waiter::new(WaitConfig::new("waiting for service", Duration::from_secs(600)));
/// let mut progress = waiter.subscribe();
/// waiter.wait(&fetcher, ReachStatusHandler::new("READY"), &cancel).await?;
/// ```
pub struct Waiter {
    config: WaitConfig,
    progress: watch::Sender<String>,
}

impl Waiter {
    pub fn new(config: WaitConfig) -> Self {
        let (progress, _) = watch::channel(String::new());
        Self { config, progress }
    }

    pub fn config(&self) -> &WaitConfig {
        &self.config
    }

    /// Follow progress messages as they change
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.progress.subscribe()
    }

    /// The latest progress message
    pub fn message(&self) -> String {
        self.progress.borrow().clone()
    }

    fn publish(&self, message: String) {
        self.progress.send_replace(message);
    }

    fn timed_out(&self) -> WaitError {
        tracing::warn!(context = %self.config.context, timeout = ?self.config.timeout, "wait timed out");
        WaitError::Timeout {
            context: self.config.context.clone(),
            timeout: self.config.timeout,
        }
    }

    fn canceled(&self) -> WaitError {
        tracing::info!(context = %self.config.context, "wait canceled");
        WaitError::Canceled {
            context: self.config.context.clone(),
        }
    }

    /// Run the loop to completion
    ///
    /// The first fetch happens immediately, then one per poll interval.
    /// Fetch errors and transient handler messages only update progress.
    pub async fn wait<R, F, H>(
        &self,
        fetcher: &F,
        mut handler: H,
        cancel: &CancellationToken,
    ) -> WaitResult<()>
    where
        R: Send,
        F: StatusFetcher<R> + ?Sized,
        H: WaitHandler<R>,
    {
        let deadline = tokio::time::sleep(self.config.timeout);
        tokio::pin!(deadline);

        // A zero period panics in `interval`
        let mut ticker = tokio::time::interval(self.config.poll_interval.max(MIN_POLL_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut ticks: u64 = 0;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.canceled()),
                _ = &mut deadline => return Err(self.timed_out()),
                _ = ticker.tick() => {}
            }
            ticks += 1;

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.canceled()),
                _ = &mut deadline => return Err(self.timed_out()),
                fetched = fetcher.fetch() => fetched,
            };

            let response = match fetched {
                Ok(response) => response,
                Err(err) => {
                    tracing::debug!(tick = ticks, error = %err, "status fetch failed, retrying");
                    self.publish(err.to_string());
                    continue;
                }
            };

            match handler.evaluate(&response) {
                WaitOutcome::Done => {
                    tracing::debug!(tick = ticks, context = %self.config.context, "wait complete");
                    return Ok(());
                }
                WaitOutcome::Fatal(message) => {
                    tracing::warn!(tick = ticks, error = %message, "wait failed");
                    return Err(WaitError::FatalRemoteState(message));
                }
                WaitOutcome::Continue(Some(transient)) => {
                    tracing::debug!(tick = ticks, message = %transient, "transient status");
                    self.publish(transient);
                }
                WaitOutcome::Continue(None) => self.publish(handler.message()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use parking_lot::Mutex;

    use crate::types::Service;
    use crate::waiter::{ReachAbsenceHandler, ReachStatusHandler};

    /// Replays a fixed sequence of responses, repeating the last one forever
    struct ScriptedFetcher {
        script: Mutex<VecDeque<Result<StatusResponse<Service>, FetchError>>>,
        last: Mutex<Option<Result<StatusResponse<Service>, FetchError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(script: Vec<Result<StatusResponse<Service>, FetchError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
                calls: AtomicUsize::new(0),
            }
        }

        fn statuses(statuses: &[&str]) -> Self {
            Self::new(
                statuses
                    .iter()
                    .map(|s| Ok(StatusResponse::ok(Service::new("p", "s").with_status(*s))))
                    .collect(),
            )
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusFetcher<Service> for ScriptedFetcher {
        async fn fetch(&self) -> Result<StatusResponse<Service>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().pop_front();
            match next {
                Some(response) => {
                    *self.last.lock() = Some(response.clone());
                    response
                }
                None => self
                    .last
                    .lock()
                    .clone()
                    .unwrap_or_else(|| Err(FetchError::new("empty script"))),
            }
        }
    }

    fn waiter(timeout_secs: u64) -> Waiter {
        Waiter::new(WaitConfig::new("waiting for service s", Duration::from_secs(timeout_secs)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaches_target() {
        let fetcher = ScriptedFetcher::statuses(&["QUEUED", "CONFIGURING", "READY"]);
        let waiter = waiter(60);

        waiter
            .wait(&fetcher, ReachStatusHandler::new("READY"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), 3);
        assert_eq!(waiter.message(), "status: CONFIGURING");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_status_stops_after_three_ticks() {
        let fetcher = ScriptedFetcher::statuses(&["CONFIGURING", "CONFIGURING", "FAILED", "READY"]);
        let waiter = waiter(60);

        let err = waiter
            .wait(&fetcher, ReachStatusHandler::new("READY"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::FatalRemoteState(_)));
        assert_eq!(fetcher.calls(), 3);

        // Nothing keeps polling once the wait has returned
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_poll_interval_is_clamped() {
        let config = WaitConfig::new("waiting for service s", Duration::from_secs(60))
            .with_poll_interval(Duration::ZERO);
        assert_eq!(config.poll_interval, MIN_POLL_INTERVAL);

        let fetcher = ScriptedFetcher::statuses(&["CONFIGURING", "READY"]);
        Waiter::new(config)
            .wait(&fetcher, ReachStatusHandler::new("READY"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(fetcher.calls(), 2);

        // Set directly, bypassing the builder
        let mut config = WaitConfig::new("waiting for service s", Duration::from_secs(60));
        config.poll_interval = Duration::ZERO;
        let fetcher = ScriptedFetcher::statuses(&["CONFIGURING", "READY"]);
        Waiter::new(config)
            .wait(&fetcher, ReachStatusHandler::new("READY"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_not_cancellation() {
        let fetcher = ScriptedFetcher::statuses(&["CONFIGURING"]);
        let waiter = waiter(5);

        let err = waiter
            .wait(&fetcher, ReachStatusHandler::new("READY"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(!err.is_canceled());
        assert_eq!(err.to_string(), "waiting for service s: timed out after 5s");
        assert!(fetcher.calls() >= 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_is_not_timeout() {
        let fetcher = ScriptedFetcher::statuses(&["CONFIGURING"]);
        let waiter = waiter(60);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            trigger.cancel();
        });

        let err = waiter
            .wait(&fetcher, ReachStatusHandler::new("READY"), &cancel)
            .await
            .unwrap_err();

        assert!(err.is_canceled());
        assert!(!err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancellation_reaches_child_token() {
        let fetcher = ScriptedFetcher::statuses(&["CONFIGURING"]);
        let parent = CancellationToken::new();
        let child = parent.child_token();

        let trigger = parent.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            trigger.cancel();
        });

        let err = waiter(60)
            .wait(&fetcher, ReachStatusHandler::new("READY"), &child)
            .await
            .unwrap_err();

        assert!(err.is_canceled());
        assert!(child.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_never_fetches() {
        let fetcher = ScriptedFetcher::statuses(&["READY"]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = waiter(60)
            .wait(&fetcher, ReachStatusHandler::new("READY"), &cancel)
            .await
            .unwrap_err();

        assert!(err.is_canceled());
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_errors_are_retried() {
        let fetcher = ScriptedFetcher::new(vec![
            Err(FetchError::new("connection refused")),
            Ok(StatusResponse::empty(503)),
            Ok(StatusResponse::ok(Service::new("p", "s").with_status("READY"))),
        ]);
        let waiter = waiter(60);
        let mut progress = waiter.subscribe();

        waiter
            .wait(&fetcher, ReachStatusHandler::new("READY"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), 3);
        assert!(progress.has_changed().unwrap());
        assert_eq!(*progress.borrow_and_update(), "server error (503), retrying");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_surfaces_as_message() {
        let fetcher = ScriptedFetcher::new(vec![Err(FetchError::new("connection refused"))]);
        let waiter = waiter(3);

        let err = waiter
            .wait(&fetcher, ReachStatusHandler::new("READY"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(waiter.message(), "connection refused");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_deletion() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(StatusResponse::ok(Service::new("p", "s").with_status("DELETING"))),
            Ok(StatusResponse::empty(404)),
        ]);

        waiter(60)
            .wait(&fetcher, ReachAbsenceHandler::new(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_waits_are_independent() {
        let ready = Arc::new(ScriptedFetcher::statuses(&["CONFIGURING", "READY"]));
        let failing = Arc::new(ScriptedFetcher::statuses(&["ERROR"]));

        let a = {
            let fetcher = ready.clone();
            tokio::spawn(async move {
                waiter(60)
                    .wait(fetcher.as_ref(), ReachStatusHandler::new("READY"), &CancellationToken::new())
                    .await
            })
        };
        let b = {
            let fetcher = failing.clone();
            tokio::spawn(async move {
                waiter(60)
                    .wait(fetcher.as_ref(), ReachStatusHandler::new("READY"), &CancellationToken::new())
                    .await
            })
        };

        assert!(a.await.unwrap().is_ok());
        assert!(b.await.unwrap().is_err());
    }
}
