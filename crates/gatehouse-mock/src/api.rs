//! File-backed mock API implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use gatehouse_core::error::{AuthError, Error, InvalidInputError};
use gatehouse_core::{
    AccessToken, Api, ApiErrorBody, ApiResponse, ApiUrl, Credentials, LoginData, Meta, NewUser,
    PageRequest, Paginated, Pagination, RefreshToken, Registration, Result, Role, TokenPair,
    TokenStore, User, UserId, UserUpdate,
};

use crate::state::{MockState, StateFile, StoredUser, hash_password, verify_password};

/// Artificial latency applied to every call unless overridden.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(300);

/// Lifetime of mock access tokens, in seconds.
pub const TOKEN_EXPIRES_IN: u64 = 3600;

/// An [`Api`] that keeps users and the session in a JSON file instead of
/// calling a server.
///
/// Selected with a `file://` API URL; the path is the state directory.
#[derive(Clone)]
pub struct MockApi {
    state: StateFile,
    url: ApiUrl,
    store: Arc<dyn TokenStore>,
    delay: Duration,
}

impl MockApi {
    /// Create a mock backend for a `file://` URL, persisting issued tokens in
    /// `store`.
    pub fn new(url: ApiUrl, store: Arc<dyn TokenStore>) -> Result<Self> {
        let root = url.to_file_path().ok_or_else(|| InvalidInputError::ApiUrl {
            value: url.to_string(),
            reason: "mock backend needs a file:// URL".to_string(),
        })?;

        Ok(Self {
            state: StateFile::new(root),
            url,
            store,
            delay: DEFAULT_DELAY,
        })
    }

    /// Override the artificial latency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns the state directory.
    pub fn root(&self) -> &std::path::Path {
        self.state.root()
    }

    /// Drop all mock data; the next call starts from the fixtures.
    pub fn reset(&self) -> Result<()> {
        self.state.reset()
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    /// Check that the stored access token is the one the mock issued last.
    fn authenticate(&self, state: &MockState) -> Result<()> {
        let pair = self.store.get()?.ok_or(AuthError::NoSession)?;
        match (&state.access_token, &state.current_user) {
            (Some(issued), Some(_)) if issued == pair.access_token.as_str() => Ok(()),
            _ => Err(api_error(401, "UNAUTHORIZED", "Invalid or expired token")),
        }
    }

    fn issue_tokens(&self, state: &mut MockState, user: &UserId) -> LoginData {
        let access = generate_token("mock_access");
        let refresh = generate_token("mock_refresh");

        state.current_user = Some(user.clone());
        state.access_token = Some(access.clone());
        state.refresh_token = Some(refresh.clone());

        LoginData {
            access_token: AccessToken::new(access),
            refresh_token: RefreshToken::new(refresh),
            expires_in: TOKEN_EXPIRES_IN,
            user: state.find(user).map(|u| u.user.clone()),
        }
    }

    fn start_session(&self, data: &LoginData) -> Result<()> {
        self.store.set(TokenPair::new(
            data.access_token.clone(),
            data.refresh_token.clone(),
            data.expires_in,
        ))
    }
}

impl std::fmt::Debug for MockApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockApi")
            .field("url", &self.url)
            .field("delay", &self.delay)
            .finish()
    }
}

#[async_trait]
impl Api for MockApi {
    fn url(&self) -> &ApiUrl {
        &self.url
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email()))]
    async fn login(&self, credentials: &Credentials) -> Result<ApiResponse<LoginData>> {
        self.pause().await;

        let data = self.state.update(|state| {
            let id = state
                .find_by_email(credentials.email())
                .filter(|u| verify_password(credentials.password(), &u.password_hash))
                .map(|u| u.user.id.clone())
                .ok_or_else(|| AuthError::InvalidCredentials("Invalid email or password".to_string()))?;
            Ok(self.issue_tokens(state, &id))
        })?;

        self.start_session(&data)?;
        info!("Logged in to mock API");
        Ok(ApiResponse::success("Login successful", data, meta()))
    }

    #[instrument(skip(self, registration), fields(email = %registration.email))]
    async fn register(&self, registration: &Registration) -> Result<ApiResponse<LoginData>> {
        self.pause().await;

        let password_hash = hash_password(&registration.password)?;
        let data = self.state.update(|state| {
            if state.is_taken(Some(&registration.email), Some(&registration.username), None) {
                return Err(already_exists());
            }

            let user = User {
                id: new_user_id()?,
                email: registration.email.clone(),
                username: registration.username.clone(),
                first_name: registration.first_name.clone(),
                last_name: registration.last_name.clone(),
                role: Role::User,
                status: "active".to_string(),
                email_verified: false,
            };
            let id = user.id.clone();
            state.users.push(StoredUser {
                user,
                password_hash,
            });
            Ok(self.issue_tokens(state, &id))
        })?;

        self.start_session(&data)?;
        info!("Registered with mock API");
        Ok(ApiResponse::success("User registered successfully", data, meta()))
    }

    #[instrument(skip(self))]
    async fn me(&self) -> Result<ApiResponse<User>> {
        self.pause().await;

        let state = self.state.read()?;
        self.authenticate(&state)?;

        let user = state
            .current_user
            .as_ref()
            .and_then(|id| state.find(id))
            .map(|u| u.user.clone())
            .ok_or_else(|| api_error(401, "UNAUTHORIZED", "Invalid or expired token"))?;

        Ok(ApiResponse::success("User information retrieved", user, meta()))
    }

    #[instrument(skip(self))]
    async fn refresh(&self) -> Result<()> {
        self.pause().await;

        let pair = self.store.get()?.ok_or(AuthError::NoSession)?;
        let result = self.state.update(|state| {
            let valid = state.current_user.is_some()
                && state.refresh_token.as_deref() == Some(pair.refresh_token.as_str());
            if !valid {
                return Err(AuthError::RefreshRejected {
                    reason: "Invalid refresh token".to_string(),
                }
                .into());
            }

            let id = state.current_user.clone().ok_or(AuthError::NoSession)?;
            Ok(self.issue_tokens(state, &id))
        });

        match result {
            Ok(data) => {
                self.start_session(&data)?;
                debug!("Mock session refreshed");
                Ok(())
            }
            Err(e) => {
                self.store.clear()?;
                Err(e)
            }
        }
    }

    #[instrument(skip(self))]
    async fn logout(&self) -> Result<()> {
        self.pause().await;

        let result = self.state.update(|state| {
            state.end_session();
            Ok(())
        });

        self.store.clear()?;
        info!("Logged out of mock API");
        result
    }

    #[instrument(skip(self))]
    async fn list_users(&self, page: PageRequest) -> Result<ApiResponse<Paginated<User>>> {
        self.pause().await;

        let state = self.state.read()?;
        self.authenticate(&state)?;

        let pagination = Pagination::compute(state.users.len() as u64, page.page, page.per_page);
        let skip = (pagination.page as usize - 1) * pagination.per_page as usize;
        let data = state
            .users
            .iter()
            .skip(skip)
            .take(pagination.per_page as usize)
            .map(|u| u.user.clone())
            .collect();

        Ok(ApiResponse::success(
            "Users retrieved successfully",
            Paginated { data, pagination },
            meta(),
        ))
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn get_user(&self, id: &UserId) -> Result<ApiResponse<User>> {
        self.pause().await;

        let state = self.state.read()?;
        self.authenticate(&state)?;

        let user = state.find(id).map(|u| u.user.clone()).ok_or_else(not_found)?;
        Ok(ApiResponse::success("User retrieved successfully", user, meta()))
    }

    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn create_user(&self, user: &NewUser) -> Result<ApiResponse<User>> {
        self.pause().await;

        let password_hash = hash_password(&user.password)?;
        let created = self.state.update(|state| {
            self.authenticate(state)?;
            if state.is_taken(Some(&user.email), Some(&user.username), None) {
                return Err(already_exists());
            }

            let created = User {
                id: new_user_id()?,
                email: user.email.clone(),
                username: user.username.clone(),
                first_name: user.first_name.clone().unwrap_or_default(),
                last_name: user.last_name.clone().unwrap_or_default(),
                role: user.role.unwrap_or_default(),
                status: "active".to_string(),
                email_verified: false,
            };
            state.users.push(StoredUser {
                user: created.clone(),
                password_hash,
            });
            Ok(created)
        })?;

        debug!(id = %created.id, "Created mock user");
        Ok(ApiResponse::success("User created successfully", created, meta()))
    }

    #[instrument(skip(self, update), fields(id = %id))]
    async fn update_user(&self, id: &UserId, update: &UserUpdate) -> Result<ApiResponse<User>> {
        self.pause().await;

        let updated = self.state.update(|state| {
            self.authenticate(state)?;
            if state.find(id).is_none() {
                return Err(not_found());
            }
            if state.is_taken(update.email.as_deref(), update.username.as_deref(), Some(id)) {
                return Err(already_exists());
            }

            let stored = state
                .users
                .iter_mut()
                .find(|u| &u.user.id == id)
                .ok_or_else(not_found)?;
            let user = &mut stored.user;
            if let Some(ref email) = update.email {
                user.email = email.clone();
            }
            if let Some(ref username) = update.username {
                user.username = username.clone();
            }
            if let Some(ref first_name) = update.first_name {
                user.first_name = first_name.clone();
            }
            if let Some(ref last_name) = update.last_name {
                user.last_name = last_name.clone();
            }
            Ok(user.clone())
        })?;

        Ok(ApiResponse::success("User updated successfully", updated, meta()))
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn delete_user(&self, id: &UserId) -> Result<()> {
        self.pause().await;

        let ended_session = self.state.update(|state| {
            self.authenticate(state)?;
            let before = state.users.len();
            state.users.retain(|u| &u.user.id != id);
            if state.users.len() == before {
                return Err(not_found());
            }

            let own = state.current_user.as_ref() == Some(id);
            if own {
                state.end_session();
            }
            Ok(own)
        })?;

        if ended_session {
            debug!("Deleted the logged-in user, ending session");
            self.store.clear()?;
        }
        Ok(())
    }
}

fn meta() -> Meta {
    Meta {
        correlation_id: Uuid::new_v4().to_string(),
        timestamp: Utc::now().to_rfc3339(),
        request_id: Uuid::new_v4().to_string(),
        version: "1.0".to_string(),
    }
}

fn generate_token(prefix: &str) -> String {
    format!(
        "{}_{}_{}",
        prefix,
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

fn new_user_id() -> Result<UserId> {
    UserId::new(Uuid::new_v4().to_string())
}

fn api_error(status: u16, code: &str, message: &str) -> Error {
    let mut body = ApiErrorBody::new(code, message);
    body.meta = Some(meta());
    Error::from_response(status, Some(body))
}

fn not_found() -> Error {
    api_error(404, "USER_NOT_FOUND", "User not found")
}

fn already_exists() -> Error {
    api_error(409, "USER_ALREADY_EXISTS", "User with this email or username already exists")
}
