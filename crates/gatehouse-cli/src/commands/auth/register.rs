//! Register command implementation.

use anyhow::{Context, Result};
use clap::Args;

use gatehouse_core::{Api, Registration};

use crate::cli::BackendArgs;
use crate::output;
use crate::session::CliBackend;

#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// Username
    #[arg(long)]
    pub username: String,

    /// Account password
    #[arg(long)]
    pub password: String,

    /// First name
    #[arg(long)]
    pub first_name: String,

    /// Last name
    #[arg(long)]
    pub last_name: String,
}

pub async fn run(args: RegisterArgs, backend: &BackendArgs) -> Result<()> {
    let api = CliBackend::open(backend)?;
    let registration = Registration {
        email: args.email,
        username: args.username,
        password: args.password,
        first_name: args.first_name,
        last_name: args.last_name,
    };

    let response = api
        .register(&registration)
        .await
        .context("Failed to register")?;

    output::success("Account created, logged in");
    if let Some(ref user) = response.data.user {
        println!();
        output::user(user);
    }

    Ok(())
}
