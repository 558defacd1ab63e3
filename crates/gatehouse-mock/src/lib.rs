//! gatehouse-mock - Filesystem-backed mock API.
//!
//! [`MockApi`] implements the same [`Api`](gatehouse_core::Api) contract as
//! the HTTP backend, keeping users and the session in a JSON file so the
//! client can be exercised without a server.

mod api;
mod state;

pub use api::{DEFAULT_DELAY, MockApi, TOKEN_EXPIRES_IN};
