//! Delete user command implementation.

use anyhow::{Context, Result};
use clap::Args;

use gatehouse_core::{Api, UserId};

use crate::cli::BackendArgs;
use crate::output;
use crate::session::CliBackend;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// User ID
    pub id: String,
}

pub async fn run(args: DeleteArgs, backend: &BackendArgs) -> Result<()> {
    let id = UserId::new(&args.id).context("Invalid user ID")?;
    let api = CliBackend::open(backend)?;

    api.delete_user(&id).await.context("Failed to delete user")?;

    output::success(&format!("Deleted user {}", id));
    Ok(())
}
