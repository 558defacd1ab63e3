//! Auth subcommand implementations.

mod login;
mod logout;
mod refresh;
mod register;
mod whoami;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::BackendArgs;

#[derive(Args, Debug)]
pub struct AuthCommand {
    #[command(subcommand)]
    pub command: AuthSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthSubcommand {
    /// Log in and store the session
    Login(login::LoginArgs),

    /// Create an account and log in
    Register(register::RegisterArgs),

    /// End the session
    Logout(logout::LogoutArgs),

    /// Display the logged-in user
    Whoami(whoami::WhoamiArgs),

    /// Refresh the session tokens
    Refresh(refresh::RefreshArgs),
}

pub async fn handle(cmd: AuthCommand, backend: &BackendArgs) -> Result<()> {
    match cmd.command {
        AuthSubcommand::Login(args) => login::run(args, backend).await,
        AuthSubcommand::Register(args) => register::run(args, backend).await,
        AuthSubcommand::Logout(args) => logout::run(args, backend).await,
        AuthSubcommand::Whoami(args) => whoami::run(args, backend).await,
        AuthSubcommand::Refresh(args) => refresh::run(args, backend).await,
    }
}
