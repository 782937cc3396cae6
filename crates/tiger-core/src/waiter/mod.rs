//! Polling for long-running remote operations
//!
//! A `Waiter` fetches a resource status once per interval and hands each
//! response to a `WaitHandler`, which decides whether to keep going, stop
//! successfully, or give up. Timeouts and cancellation are reported as
//! distinct errors.

mod handlers;
mod poll;

pub use handlers::{
    ReachAbsenceHandler, ReachStatusHandler, WaitHandler, WaitOutcome, FATAL_STATUSES,
};
pub use poll::{
    FetchError, StatusFetcher, WaitConfig, WaitError, WaitResult, Waiter, DEFAULT_POLL_INTERVAL,
    MIN_POLL_INTERVAL,
};
