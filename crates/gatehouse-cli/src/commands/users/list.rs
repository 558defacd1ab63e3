//! List users command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use gatehouse_core::{Api, PageRequest};

use crate::cli::BackendArgs;
use crate::output;
use crate::session::CliBackend;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Users per page
    #[arg(long, default_value_t = 20)]
    pub per_page: u32,

    /// Print the page as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: ListArgs, backend: &BackendArgs) -> Result<()> {
    let api = CliBackend::open(backend)?;

    let page = api
        .list_users(PageRequest {
            page: args.page,
            per_page: args.per_page,
        })
        .await
        .context("Failed to list users")?
        .into_data();

    if args.json {
        return output::json_pretty(&page);
    }

    if page.data.is_empty() {
        eprintln!("{}", "No users found.".dimmed());
        return Ok(());
    }

    for user in &page.data {
        output::user_row(user);
    }

    let p = &page.pagination;
    eprintln!();
    eprintln!(
        "{}",
        format!("Page {} of {} ({} users)", p.page, p.total_pages, p.total).dimmed()
    );
    if let Some(next) = p.next_page {
        eprintln!("{}: --page {}", "Next".dimmed(), next);
    }

    Ok(())
}
