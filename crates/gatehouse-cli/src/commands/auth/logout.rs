//! Logout command implementation.

use anyhow::Result;
use clap::Args;

use gatehouse_core::Api;

use crate::cli::BackendArgs;
use crate::output;
use crate::session::CliBackend;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub async fn run(_args: LogoutArgs, backend: &BackendArgs) -> Result<()> {
    let api = CliBackend::open(backend)?;

    // Local tokens are gone either way; a failed upstream call is only a warning.
    if let Err(e) = api.logout().await {
        tracing::warn!(error = %e, "Logout request failed");
    }

    output::success("Logged out");
    Ok(())
}
