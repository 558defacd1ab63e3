//! gatehouse-core - Core types and traits for the gatehouse API client.
//!
//! Defines the token model, the API envelope and user types, the error
//! taxonomy, and the two seams every backend plugs into: [`Api`] for the
//! upstream contract and [`TokenStore`] for token persistence.

pub mod credentials;
pub mod envelope;
pub mod error;
pub mod store;
pub mod tokens;
pub mod traits;
pub mod types;
pub mod user;

pub use credentials::Credentials;
pub use envelope::{ApiErrorBody, ApiResponse, FieldError, Meta, Paginated, Pagination};
pub use error::Error;
pub use store::{FileTokenStore, MemoryTokenStore};
pub use tokens::{AccessToken, RefreshToken, TokenPair};
pub use traits::{Api, TokenStore};
pub use types::{ApiUrl, UserId};
pub use user::{LoginData, NewUser, PageRequest, Registration, Role, User, UserUpdate};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
