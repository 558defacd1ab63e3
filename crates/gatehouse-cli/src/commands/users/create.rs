//! Create user command implementation.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use gatehouse_core::{Api, NewUser, Role};

use crate::cli::BackendArgs;
use crate::output;
use crate::session::CliBackend;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum RoleArg {
    Admin,
    User,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Admin => Role::Admin,
            RoleArg::User => Role::User,
        }
    }
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Email address
    #[arg(long)]
    pub email: String,

    /// Username
    #[arg(long)]
    pub username: String,

    /// Initial password
    #[arg(long)]
    pub password: String,

    /// First name
    #[arg(long)]
    pub first_name: Option<String>,

    /// Last name
    #[arg(long)]
    pub last_name: Option<String>,

    /// Role (defaults to user)
    #[arg(long, value_enum)]
    pub role: Option<RoleArg>,
}

pub async fn run(args: CreateArgs, backend: &BackendArgs) -> Result<()> {
    let api = CliBackend::open(backend)?;

    let user = NewUser {
        email: args.email,
        username: args.username,
        password: args.password,
        first_name: args.first_name,
        last_name: args.last_name,
        role: args.role.map(Role::from),
    };

    let created = api
        .create_user(&user)
        .await
        .context("Failed to create user")?
        .into_data();

    output::user(&created);
    output::success("User created successfully");

    Ok(())
}
