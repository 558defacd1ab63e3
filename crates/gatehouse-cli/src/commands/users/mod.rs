//! User management subcommands.

mod create;
mod delete;
mod get;
mod list;
mod update;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::BackendArgs;

#[derive(Args, Debug)]
pub struct UsersCommand {
    #[command(subcommand)]
    pub command: UsersSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum UsersSubcommand {
    /// List users, one page at a time
    List(list::ListArgs),

    /// Show a single user
    Get(get::GetArgs),

    /// Create a user
    Create(create::CreateArgs),

    /// Change fields of a user
    Update(update::UpdateArgs),

    /// Delete a user
    Delete(delete::DeleteArgs),
}

pub async fn handle(cmd: UsersCommand, backend: &BackendArgs) -> Result<()> {
    match cmd.command {
        UsersSubcommand::List(args) => list::run(args, backend).await,
        UsersSubcommand::Get(args) => get::run(args, backend).await,
        UsersSubcommand::Create(args) => create::run(args, backend).await,
        UsersSubcommand::Update(args) => update::run(args, backend).await,
        UsersSubcommand::Delete(args) => delete::run(args, backend).await,
    }
}
