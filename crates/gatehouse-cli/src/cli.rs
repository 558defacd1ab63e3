//! CLI argument definitions.

use clap::{Args, Parser, Subcommand};

use crate::commands::auth::AuthCommand;
use crate::commands::users::UsersCommand;

/// Log in to a gatehouse API and manage its users.
#[derive(Parser, Debug)]
#[command(name = "gatehouse")]
#[command(author, version = env!("GATEHOUSE_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub backend: BackendArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where requests go. Unset options fall back to the GATEHOUSE_* environment.
#[derive(Args, Debug, Clone, Default)]
pub struct BackendArgs {
    /// API base URL (https://..., http://localhost..., or file:// for the mock)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Use the local mock API instead of the network
    #[arg(long, global = true)]
    pub mock: bool,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Session operations
    Auth(AuthCommand),

    /// User management
    Users(UsersCommand),
}
