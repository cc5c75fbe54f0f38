//! Retry policy
//!
//! A [`RetryPolicy`] is an immutable value handed to every client call. It
//! decides from each [`OperationResponse`] whether the call is attempted
//! again, and how long to back off before doing so.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::{Instant, sleep};

use crate::client::ApiResponse;
use crate::error::{OciError, OciResult};

/// What a single attempt of an API call produced
#[derive(Debug, Clone, Copy)]
pub struct OperationResponse<'a> {
    /// API operation name, e.g. "GetWorkRequest"
    pub operation: &'a str,
    /// 1-based attempt number
    pub attempt: u32,
    /// When the first attempt started
    pub started: Instant,
    /// HTTP status; `None` when no response arrived
    pub status: Option<u16>,
    /// Service error code of a failed call
    pub error_code: Option<&'a str>,
    /// Decoded body of a successful call
    pub body: Option<&'a serde_json::Value>,
}

impl OperationResponse<'_> {
    pub fn is_success(&self) -> bool {
        self.status.is_some_and(|s| (200..300).contains(&s))
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// How long different classes of failures keep being retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryWindows {
    /// Window for 404 responses
    pub short: Duration,
    /// Window for throttling, conflicts, server and transport errors
    pub long: Duration,
}

impl Default for RetryWindows {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(2 * 60),
            long: Duration::from_secs(10 * 60),
        }
    }
}

type ShouldRetryFn = dyn Fn(&OperationResponse<'_>) -> bool + Send + Sync;

/// Backoff schedule, attempt limit and retry predicate
#[derive(Clone)]
pub struct RetryPolicy {
    pub max_attempts: Option<u32>,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter: bool,
    pub windows: RetryWindows,
    should_retry: Arc<ShouldRetryFn>,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("initial_backoff", &self.initial_backoff)
            .field("max_backoff", &self.max_backoff)
            .field("jitter", &self.jitter)
            .field("windows", &self.windows)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// Policy using the default retry rules with default windows
    pub fn new(
        max_attempts: Option<u32>,
        initial_backoff: Duration,
        max_backoff: Duration,
        jitter: bool,
    ) -> Self {
        let windows = RetryWindows::default();
        Self {
            max_attempts,
            initial_backoff,
            max_backoff,
            jitter,
            windows,
            should_retry: Arc::new(default_should_retry(false, windows)),
        }
    }

    /// Policy that makes exactly one attempt
    pub fn no_retry() -> Self {
        Self::new(Some(1), Duration::ZERO, Duration::ZERO, false)
    }

    /// Same schedule with the default rules for the given windows
    pub fn with_default_should_retry(
        &self,
        disable_not_found_retries: bool,
        windows: RetryWindows,
    ) -> Self {
        Self {
            windows,
            should_retry: Arc::new(default_should_retry(disable_not_found_retries, windows)),
            ..self.clone()
        }
    }

    /// Same schedule with a different retry predicate
    pub fn with_should_retry<F>(&self, should_retry: F) -> Self
    where
        F: Fn(&OperationResponse<'_>) -> bool + Send + Sync + 'static,
    {
        Self {
            should_retry: Arc::new(should_retry),
            ..self.clone()
        }
    }

    /// Whether another attempt follows `response`
    pub fn should_retry(&self, response: &OperationResponse<'_>) -> bool {
        if self.max_attempts.is_some_and(|max| response.attempt >= max) {
            return false;
        }
        (self.should_retry)(response)
    }

    /// Wait before retry number `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let initial = self.initial_backoff.as_millis() as u64;
        let max = self.max_backoff.as_millis() as u64;
        let exponential = initial.saturating_mul(2u64.saturating_pow(attempt));
        let capped = exponential.min(max);

        if self.jitter && capped > 0 {
            // Full jitter: random between 0 and capped
            let mut rng = rand::thread_rng();
            Duration::from_millis(rng.gen_range(0..=capped))
        } else {
            Duration::from_millis(capped)
        }
    }

    /// Run `call` until it succeeds or the policy stops retrying.
    ///
    /// Errors that did not come from the service or the transport (decode
    /// failures, invalid input) are returned without retrying.
    pub async fn execute<F, Fut>(&self, operation: &str, mut call: F) -> OciResult<ApiResponse>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = OciResult<ApiResponse>>,
    {
        let started = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let outcome = call().await;

            let response = match &outcome {
                Ok(resp) => Some(OperationResponse {
                    operation,
                    attempt,
                    started,
                    status: Some(resp.status),
                    error_code: None,
                    body: Some(&resp.body),
                }),
                Err(OciError::Service { status, code, .. }) => Some(OperationResponse {
                    operation,
                    attempt,
                    started,
                    status: Some(*status),
                    error_code: Some(code.as_str()),
                    body: None,
                }),
                Err(OciError::Transport(_)) => Some(OperationResponse {
                    operation,
                    attempt,
                    started,
                    status: None,
                    error_code: None,
                    body: None,
                }),
                Err(_) => None,
            };

            if !response.is_some_and(|r| self.should_retry(&r)) {
                return outcome;
            }

            let delay = self.backoff(attempt - 1);
            match &outcome {
                Ok(_) => log::debug!(
                    "{} not finished (attempt {}), polling again in {}ms",
                    operation,
                    attempt,
                    delay.as_millis()
                ),
                Err(e) => log::warn!(
                    "{} failed (attempt {}): {} - retrying in {}ms",
                    operation,
                    attempt,
                    e,
                    delay.as_millis()
                ),
            }
            sleep(delay).await;
        }
    }
}

/// The default retry rules.
///
/// Transport errors, throttling (429), server errors (5xx) and 409s caused by
/// a resource being busy are retried within the long window. A 404 is
/// retried within the short window unless not-found retries are disabled.
/// Successful calls and all other client errors are final.
pub fn default_should_retry(
    disable_not_found_retries: bool,
    windows: RetryWindows,
) -> impl Fn(&OperationResponse<'_>) -> bool + Send + Sync + Clone + 'static {
    move |response| {
        let elapsed = response.elapsed();
        let within_long = elapsed < windows.long;
        match response.status {
            None => within_long,
            Some(status) if (200..300).contains(&status) => false,
            Some(404) => !disable_not_found_retries && elapsed < windows.short,
            Some(409) => {
                matches!(
                    response.error_code,
                    Some("IncorrectState") | Some("ConflictingOperation")
                ) && within_long
            }
            Some(429) => within_long,
            Some(status) if status >= 500 => within_long,
            Some(_) => false,
        }
    }
}
