//! Where the CLI keeps its files.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;

/// Platform data directory, created on first use.
pub fn data_dir() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("", "", "gatehouse").context("Could not determine data directory")?;

    let data_dir = dirs.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data directory")?;

    Ok(data_dir.to_path_buf())
}

/// Token file for sessions against a real API.
pub fn token_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("tokens.json"))
}

/// Default state directory of the mock API.
pub fn mock_dir() -> Result<PathBuf> {
    Ok(data_dir()?.join("mock"))
}
