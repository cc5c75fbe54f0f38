//! Waiter - Poll a resource until it reaches a target state
//!
//! Long running operations report progress through a state string. A
//! [`StateChangeConf`] describes which states mean "keep waiting" and which
//! mean "done", and [`StateChangeConf::wait_for_state`] drives a refresh
//! function until one of the target states shows up or the timeout passes.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Error returned by [`StateChangeConf::wait_for_state`]
#[derive(Debug, thiserror::Error)]
pub enum WaitError<E>
where
    E: std::error::Error + 'static,
{
    #[error(
        "timeout while waiting for state to become '{}' (last state: '{last_state}', timeout: {timeout:?})",
        expected.join(", ")
    )]
    Timeout {
        expected: Vec<String>,
        last_state: String,
        timeout: Duration,
    },

    #[error("unexpected state '{state}', wanted target '{}'", expected.join(", "))]
    UnexpectedState { state: String, expected: Vec<String> },

    #[error("{0}")]
    Refresh(#[source] E),
}

/// Describes a wait for a state transition
#[derive(Debug, Clone)]
pub struct StateChangeConf {
    pub pending: Vec<String>,
    pub target: Vec<String>,
    pub timeout: Duration,
    /// Fixed time between refreshes. When unset the wait starts at 100ms and
    /// doubles up to 10s.
    pub poll_interval: Option<Duration>,
    /// Time to wait before the first refresh
    pub delay: Duration,
}

impl StateChangeConf {
    pub fn new<P, T>(pending: P, target: T, timeout: Duration) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            pending: pending.into_iter().map(Into::into).collect(),
            target: target.into_iter().map(Into::into).collect(),
            timeout,
            poll_interval: None,
            delay: Duration::ZERO,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Refresh until the reported state is one of the targets.
    ///
    /// `refresh` returns the current value together with its state. A state
    /// that is neither pending nor target ends the wait immediately.
    pub async fn wait_for_state<T, E, F, Fut>(&self, mut refresh: F) -> Result<T, WaitError<E>>
    where
        E: std::error::Error + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(T, String), E>>,
    {
        let deadline = Instant::now() + self.timeout;
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let mut backoff = MIN_POLL_INTERVAL;
        loop {
            let (value, state) = refresh().await.map_err(WaitError::Refresh)?;

            if self.target.contains(&state) {
                return Ok(value);
            }
            if !self.pending.contains(&state) {
                return Err(WaitError::UnexpectedState {
                    state,
                    expected: self.target.clone(),
                });
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(WaitError::Timeout {
                    expected: self.target.clone(),
                    last_state: state,
                    timeout: self.timeout,
                });
            }

            let interval = self.poll_interval.unwrap_or(backoff);
            log::debug!("state '{}' still pending, refreshing in {:?}", state, interval);
            sleep(interval.min(deadline - now)).await;
            backoff = (backoff * 2).min(MAX_POLL_INTERVAL);
        }
    }
}
