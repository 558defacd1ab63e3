//! Login command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use gatehouse_core::{Api, Credentials};

use crate::cli::BackendArgs;
use crate::output;
use crate::session::CliBackend;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long)]
    pub password: String,
}

pub async fn run(args: LoginArgs, backend: &BackendArgs) -> Result<()> {
    let api = CliBackend::open(backend)?;
    let credentials = Credentials::new(&args.email, &args.password);

    eprintln!("{}", "Logging in...".dimmed());

    let response = api.login(&credentials).await.context("Failed to login")?;

    output::success("Logged in successfully");
    println!();
    if let Some(ref user) = response.data.user {
        output::field("User", &user.username);
    }
    output::field("Email", &args.email);
    output::field("API", api.url().as_str());

    Ok(())
}
