//! Refresh command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use gatehouse_core::Api;

use crate::cli::BackendArgs;
use crate::output;
use crate::session::CliBackend;

#[derive(Args, Debug)]
pub struct RefreshArgs {}

pub async fn run(_args: RefreshArgs, backend: &BackendArgs) -> Result<()> {
    let api = CliBackend::open(backend)?;

    eprintln!("{}", "Refreshing session...".dimmed());

    api.refresh().await.context("Failed to refresh session")?;

    output::success("Session refreshed successfully");
    Ok(())
}
