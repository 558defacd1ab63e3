//! Whoami command implementation.

use anyhow::{Context, Result};
use clap::Args;

use gatehouse_core::Api;

use crate::cli::BackendArgs;
use crate::output;
use crate::session::CliBackend;

#[derive(Args, Debug)]
pub struct WhoamiArgs {
    /// Print the user as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: WhoamiArgs, backend: &BackendArgs) -> Result<()> {
    let api = CliBackend::open(backend)?;

    let user = api
        .me()
        .await
        .context("Failed to fetch the current user")?
        .into_data();

    if args.json {
        output::json_pretty(&user)?;
    } else {
        output::user(&user);
        output::field("API", api.url().as_str());
    }

    Ok(())
}
