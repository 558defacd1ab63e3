//! gatehouse-http - HTTP client with single-flight token refresh.
//!
//! [`HttpClient`] is the request pipeline: it attaches the bearer token,
//! classifies each attempt with a [`RetryPolicy`], and funnels every 401
//! through one [`RefreshCoordinator`] so concurrent callers share a single
//! refresh. [`HttpApi`] implements the [`Api`](gatehouse_core::Api) contract
//! on top of it.

mod api;
mod client;
mod config;
pub mod endpoints;
mod refresh;
mod retry;

pub use api::HttpApi;
pub use client::{HttpClient, IDEMPOTENCY_KEY};
pub use config::{
    ClientConfig, DEFAULT_API_URL, DEFAULT_TIMEOUT, ENV_API_URL, ENV_TIMEOUT_SECS,
    ENV_USE_MOCK_API,
};
pub use refresh::{AuthEvent, CoordinatorState, RefreshCoordinator, RefreshOutcome, Refresher};
pub use retry::{AttemptOutcome, RetryDecision, RetryPolicy};

pub use reqwest::Method;
