//! Retry policy for the request pipeline.
//!
//! The policy is a pure function from (method, attempt outcome, retries so
//! far) to the next action. It never sleeps or performs I/O itself.

use std::time::Duration;

use reqwest::Method;

/// What a single attempt produced, as far as retrying is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// 2xx response.
    Success,
    /// 401 on an authenticated request.
    Unauthorized,
    /// 500, 502, 503 or 504.
    ServerError(u16),
    /// Any other non-2xx status.
    ClientError(u16),
    /// Connection failure or timeout.
    NetworkFailure,
    /// A local failure that retrying cannot fix.
    Fatal,
}

impl AttemptOutcome {
    /// Classify a response status.
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=299 => AttemptOutcome::Success,
            401 => AttemptOutcome::Unauthorized,
            500 | 502 | 503 | 504 => AttemptOutcome::ServerError(status),
            _ => AttemptOutcome::ClientError(status),
        }
    }
}

/// The next step of the pipeline after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Hand the outcome to the caller.
    Return,
    /// Re-issue the request after the given delay.
    Retry { after: Duration },
    /// Refresh the session, then re-issue the request.
    RefreshThenRetry,
    /// The budget is spent on 401s; send the user back to login.
    LoginRequired,
}

/// Retry policy: which outcomes are retried, how often, how far apart.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    methods: Vec<Method>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(300),
            max_delay: Duration::from_secs(5),
            methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ],
        }
    }
}

impl RetryPolicy {
    /// Default policy with a custom retry budget.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Set the delay before the first plain retry; later retries double it.
    pub fn with_backoff(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    /// Retry immediately, without backoff.
    pub fn without_backoff(self) -> Self {
        self.with_backoff(Duration::ZERO, Duration::ZERO)
    }

    /// Restrict plain retries (5xx, network) to these methods.
    ///
    /// 401s are refreshed and retried for every method: the upstream
    /// rejected the request before acting on it.
    pub fn with_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    /// Maximum number of attempts beyond the original.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns true if `method` is retried on 5xx and network failures.
    pub fn retries_method(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    /// Returns true if retries of `method` need an idempotency key so the
    /// upstream can drop duplicates.
    pub fn needs_idempotency_key(&self, method: &Method) -> bool {
        (*method == Method::POST || *method == Method::PATCH)
            && self.max_retries > 0
            && self.retries_method(method)
    }

    /// Decide what to do after an attempt.
    ///
    /// `retries` is the number of retries already performed for this request.
    pub fn decide(&self, method: &Method, outcome: AttemptOutcome, retries: u32) -> RetryDecision {
        match outcome {
            AttemptOutcome::Success | AttemptOutcome::ClientError(_) | AttemptOutcome::Fatal => {
                RetryDecision::Return
            }
            AttemptOutcome::Unauthorized if retries >= self.max_retries => {
                RetryDecision::LoginRequired
            }
            AttemptOutcome::Unauthorized => RetryDecision::RefreshThenRetry,
            AttemptOutcome::ServerError(_) | AttemptOutcome::NetworkFailure => {
                if retries >= self.max_retries || !self.retries_method(method) {
                    RetryDecision::Return
                } else {
                    RetryDecision::Retry {
                        after: self.backoff(retries),
                    }
                }
            }
        }
    }

    /// Exponential backoff: `base * 2^retries`, capped at the maximum.
    fn backoff(&self, retries: u32) -> Duration {
        let factor = 2_u32.saturating_pow(retries);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}
