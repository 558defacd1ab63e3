//! Backend selection for the CLI.
//!
//! The CLI talks to either the HTTP API or the local mock; [`CliBackend`]
//! hides which one behind the [`Api`] trait.

pub mod storage;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use gatehouse_core::{
    Api, ApiResponse, ApiUrl, Credentials, FileTokenStore, LoginData, NewUser, PageRequest,
    Paginated, Registration, User, UserId, UserUpdate,
};
use gatehouse_http::{ClientConfig, HttpApi};
use gatehouse_mock::MockApi;

use crate::cli::BackendArgs;

/// The API the CLI is talking to.
#[derive(Debug)]
pub enum CliBackend {
    Http(HttpApi),
    Mock(MockApi),
}

impl CliBackend {
    /// Build the backend from the environment and command-line overrides.
    pub fn open(args: &BackendArgs) -> Result<Self> {
        let mut config = ClientConfig::from_env().context("Invalid GATEHOUSE_* environment")?;

        if let Some(ref url) = args.api_url {
            config.api_url = ApiUrl::new(url).context("Invalid API URL")?;
        }
        if let Some(secs) = args.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        let use_mock = args.mock || config.use_mock || config.api_url.is_local();

        if use_mock {
            let url = if config.api_url.is_local() {
                config.api_url.clone()
            } else {
                let dir = storage::mock_dir()?;
                ApiUrl::new(format!("file://{}", dir.display()))
                    .context("Mock directory is not a valid file:// URL")?
            };
            let root = url
                .to_file_path()
                .context("Failed to convert file:// URL to path")?;
            let store = Arc::new(FileTokenStore::new(root.join("tokens.json")));

            debug!(root = %root.display(), "Using mock API");
            let api = MockApi::new(url, store).context("Failed to open mock API")?;
            Ok(CliBackend::Mock(api))
        } else {
            let store = Arc::new(FileTokenStore::new(storage::token_path()?));

            debug!(api = %config.api_url, "Using HTTP API");
            let api = HttpApi::new(store, config).context("Failed to create HTTP client")?;
            Ok(CliBackend::Http(api))
        }
    }

    fn api(&self) -> &dyn Api {
        match self {
            CliBackend::Http(api) => api,
            CliBackend::Mock(api) => api,
        }
    }
}

#[async_trait]
impl Api for CliBackend {
    fn url(&self) -> &ApiUrl {
        self.api().url()
    }

    async fn login(&self, credentials: &Credentials) -> gatehouse_core::Result<ApiResponse<LoginData>> {
        self.api().login(credentials).await
    }

    async fn register(
        &self,
        registration: &Registration,
    ) -> gatehouse_core::Result<ApiResponse<LoginData>> {
        self.api().register(registration).await
    }

    async fn me(&self) -> gatehouse_core::Result<ApiResponse<User>> {
        self.api().me().await
    }

    async fn refresh(&self) -> gatehouse_core::Result<()> {
        self.api().refresh().await
    }

    async fn logout(&self) -> gatehouse_core::Result<()> {
        self.api().logout().await
    }

    async fn list_users(
        &self,
        page: PageRequest,
    ) -> gatehouse_core::Result<ApiResponse<Paginated<User>>> {
        self.api().list_users(page).await
    }

    async fn get_user(&self, id: &UserId) -> gatehouse_core::Result<ApiResponse<User>> {
        self.api().get_user(id).await
    }

    async fn create_user(&self, user: &NewUser) -> gatehouse_core::Result<ApiResponse<User>> {
        self.api().create_user(user).await
    }

    async fn update_user(
        &self,
        id: &UserId,
        update: &UserUpdate,
    ) -> gatehouse_core::Result<ApiResponse<User>> {
        self.api().update_user(id, update).await
    }

    async fn delete_user(&self, id: &UserId) -> gatehouse_core::Result<()> {
        self.api().delete_user(id).await
    }
}
