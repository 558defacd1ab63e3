//! API backend trait.

use async_trait::async_trait;

use crate::envelope::{ApiResponse, Paginated};
use crate::types::{ApiUrl, UserId};
use crate::user::{LoginData, NewUser, PageRequest, Registration, User, UserUpdate};
use crate::{Credentials, Result};

/// The upstream API contract: authentication plus user CRUD.
///
/// Implementations persist issued tokens in their token store, so a
/// successful [`login`](Api::login) makes later calls authenticated.
#[async_trait]
pub trait Api: Send + Sync {
    /// Returns the base URL this backend talks to.
    fn url(&self) -> &ApiUrl;

    /// Authenticate and store the issued tokens.
    async fn login(&self, credentials: &Credentials) -> Result<ApiResponse<LoginData>>;

    /// Create an account for oneself and store the issued tokens.
    async fn register(&self, registration: &Registration) -> Result<ApiResponse<LoginData>>;

    /// Look up the user the current session belongs to.
    async fn me(&self) -> Result<ApiResponse<User>>;

    /// Exchange the stored refresh token for a new pair.
    async fn refresh(&self) -> Result<()>;

    /// End the session. Local tokens are cleared even if the API call fails.
    async fn logout(&self) -> Result<()>;

    /// List one page of users.
    async fn list_users(&self, page: PageRequest) -> Result<ApiResponse<Paginated<User>>>;

    /// Fetch a single user.
    async fn get_user(&self, id: &UserId) -> Result<ApiResponse<User>>;

    /// Create a user.
    async fn create_user(&self, user: &NewUser) -> Result<ApiResponse<User>>;

    /// Apply a partial update to a user.
    async fn update_user(&self, id: &UserId, update: &UserUpdate) -> Result<ApiResponse<User>>;

    /// Delete a user.
    async fn delete_user(&self, id: &UserId) -> Result<()>;
}
