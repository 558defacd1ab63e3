//! gatehouse - CLI for the gatehouse admin API.
//!
//! A thin wrapper over `gatehouse-http` and `gatehouse-mock`: log in, keep
//! the session fresh, and manage users from the terminal.

mod cli;
mod commands;
mod output;
mod session;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use commands::{auth, users};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs);

    let result = match cli.command {
        Commands::Auth(cmd) => auth::handle(cmd, &cli.backend).await,
        Commands::Users(cmd) => users::handle(cmd, &cli.backend).await,
    };

    if let Err(ref e) = result
        && login_required(e)
    {
        output::error("Session expired. Run 'gatehouse auth login' to sign in again.");
    }

    result
}

fn login_required(err: &anyhow::Error) -> bool {
    err.downcast_ref::<gatehouse_core::Error>()
        .is_some_and(|e| e.is_login_required())
}

fn init_logging(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
