//! Get user command implementation.

use anyhow::{Context, Result};
use clap::Args;

use gatehouse_core::{Api, UserId};

use crate::cli::BackendArgs;
use crate::output;
use crate::session::CliBackend;

#[derive(Args, Debug)]
pub struct GetArgs {
    /// User ID
    pub id: String,

    /// Print the user as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: GetArgs, backend: &BackendArgs) -> Result<()> {
    let id = UserId::new(&args.id).context("Invalid user ID")?;
    let api = CliBackend::open(backend)?;

    let user = api
        .get_user(&id)
        .await
        .context("Failed to fetch user")?
        .into_data();

    if args.json {
        output::json_pretty(&user)?;
    } else {
        output::user(&user);
    }

    Ok(())
}
