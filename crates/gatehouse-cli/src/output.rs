//! Output formatting helpers.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use gatehouse_core::{Role, User};

/// Print a success message.
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print an error message.
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a labeled field.
pub fn field(label: &str, value: &str) {
    println!("{}: {}", label.dimmed(), value);
}

/// Print a value as pretty-printed JSON.
pub fn json_pretty<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Print every field of a user.
pub fn user(user: &User) {
    field("ID", user.id.as_str());
    field("Email", &user.email);
    field("Username", &user.username);
    field("Name", full_name(user).trim());
    field("Role", role(user.role));
    field("Status", &user.status);
    field("Verified", if user.email_verified { "yes" } else { "no" });
}

/// Print one line per user.
pub fn user_row(user: &User) {
    println!(
        "{}  {:<16} {:<28} {}",
        user.id.as_str().dimmed(),
        user.username,
        user.email,
        role(user.role)
    );
}

fn full_name(user: &User) -> String {
    format!("{} {}", user.first_name, user.last_name)
}

fn role(role: Role) -> &'static str {
    match role {
        Role::Admin => "admin",
        Role::User => "user",
    }
}
