//! Validated identifier types.
//!
//! These enforce their invariants at construction time so that request
//! paths can be built without further checks.

mod api_url;
mod user_id;

pub use api_url::ApiUrl;
pub use user_id::UserId;
