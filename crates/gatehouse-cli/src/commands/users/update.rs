//! Update user command implementation.

use anyhow::{Context, Result, bail};
use clap::Args;

use gatehouse_core::{Api, UserId, UserUpdate};

use crate::cli::BackendArgs;
use crate::output;
use crate::session::CliBackend;

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// User ID
    pub id: String,

    /// New email address
    #[arg(long)]
    pub email: Option<String>,

    /// New username
    #[arg(long)]
    pub username: Option<String>,

    /// New first name
    #[arg(long)]
    pub first_name: Option<String>,

    /// New last name
    #[arg(long)]
    pub last_name: Option<String>,
}

pub async fn run(args: UpdateArgs, backend: &BackendArgs) -> Result<()> {
    let id = UserId::new(&args.id).context("Invalid user ID")?;
    let update = UserUpdate {
        email: args.email,
        username: args.username,
        first_name: args.first_name,
        last_name: args.last_name,
    };

    if update.is_empty() {
        bail!("Nothing to update. Pass at least one of --email, --username, --first-name, --last-name.");
    }

    let api = CliBackend::open(backend)?;
    let updated = api
        .update_user(&id, &update)
        .await
        .context("Failed to update user")?
        .into_data();

    output::user(&updated);
    output::success("User updated successfully");

    Ok(())
}
