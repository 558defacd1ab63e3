//! Core traits for API backends and token persistence.

mod api;
mod token_store;

pub use api::Api;
pub use token_store::TokenStore;
