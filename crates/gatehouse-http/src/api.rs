//! HTTP-backed API implementation.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use gatehouse_core::error::{AuthError, Error};
use gatehouse_core::{
    Api, ApiResponse, ApiUrl, Credentials, LoginData, NewUser, PageRequest, Paginated,
    Registration, Result, TokenStore, User, UserId, UserUpdate,
};

use crate::client::HttpClient;
use crate::config::ClientConfig;
use crate::endpoints;
use crate::refresh::AuthEvent;

/// The upstream REST API, reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: HttpClient,
}

impl HttpApi {
    /// Create an API client persisting tokens in `store`.
    pub fn new(store: Arc<dyn TokenStore>, config: ClientConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(store, config)?,
        })
    }

    /// Returns the underlying request pipeline.
    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// Subscribe to session events.
    pub fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.client.auth_events()
    }

    fn start_session(&self, data: &LoginData) -> Result<()> {
        let (pair, _) = data.clone().into_parts();
        self.client.start_session(pair)
    }
}

#[async_trait]
impl Api for HttpApi {
    fn url(&self) -> &ApiUrl {
        self.client.api()
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email()))]
    async fn login(&self, credentials: &Credentials) -> Result<ApiResponse<LoginData>> {
        let response: ApiResponse<LoginData> = self
            .client
            .post_anonymous(endpoints::AUTH_LOGIN, credentials)
            .await
            .map_err(|e| match e {
                Error::Http(e) if e.status == 401 => AuthError::InvalidCredentials(
                    e.message.unwrap_or_else(|| "invalid email or password".to_string()),
                )
                .into(),
                other => other,
            })?;

        self.start_session(&response.data)?;
        info!("Logged in");
        Ok(response)
    }

    #[instrument(skip(self, registration), fields(email = %registration.email))]
    async fn register(&self, registration: &Registration) -> Result<ApiResponse<LoginData>> {
        let response: ApiResponse<LoginData> = self
            .client
            .post_anonymous(endpoints::AUTH_REGISTER, registration)
            .await?;

        self.start_session(&response.data)?;
        info!("Registered");
        Ok(response)
    }

    #[instrument(skip(self))]
    async fn me(&self) -> Result<ApiResponse<User>> {
        if self.client.store().get()?.is_none() {
            return Err(AuthError::NoSession.into());
        }
        self.client.get(endpoints::AUTH_ME).await
    }

    #[instrument(skip(self))]
    async fn refresh(&self) -> Result<()> {
        if self.client.store().get()?.is_none() {
            return Err(AuthError::NoSession.into());
        }
        self.client.refresh_session().await
    }

    #[instrument(skip(self))]
    async fn logout(&self) -> Result<()> {
        let result = if self.client.store().get()?.is_some() {
            self.client
                .request::<()>(Method::POST, endpoints::AUTH_LOGOUT, None)
                .await
                .map(|_| ())
        } else {
            debug!("No session, skipping logout call");
            Ok(())
        };

        if let Err(ref e) = result {
            warn!(error = %e, "Logout call failed, clearing local session anyway");
        }

        self.client.end_session()?;
        info!("Logged out");
        result
    }

    #[instrument(skip(self))]
    async fn list_users(&self, page: PageRequest) -> Result<ApiResponse<Paginated<User>>> {
        self.client
            .get(&endpoints::users_page(page.page, page.per_page))
            .await
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn get_user(&self, id: &UserId) -> Result<ApiResponse<User>> {
        self.client.get(&endpoints::user(id.as_str())).await
    }

    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn create_user(&self, user: &NewUser) -> Result<ApiResponse<User>> {
        self.client.post(endpoints::USERS, user).await
    }

    #[instrument(skip(self, update), fields(id = %id))]
    async fn update_user(&self, id: &UserId, update: &UserUpdate) -> Result<ApiResponse<User>> {
        self.client.patch(&endpoints::user(id.as_str()), update).await
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn delete_user(&self, id: &UserId) -> Result<()> {
        self.client
            .request::<()>(Method::DELETE, &endpoints::user(id.as_str()), None)
            .await?;
        Ok(())
    }
}
