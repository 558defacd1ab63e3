use std::path::Path;
use std::process::{Command, Output};

/// Run the CLI against a mock API rooted at `mock_dir`, with HOME isolated.
pub fn run_cli(args: &[&str], home: &Path, mock_dir: &Path) -> Output {
    let api_url = format!("file://{}", mock_dir.display());

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_gatehouse"));
    cmd.args(args);
    cmd.args(["--api-url", &api_url]);
    cmd.env("HOME", home);
    cmd.env("XDG_DATA_HOME", home.join("data"));
    cmd.env_remove("GATEHOUSE_API_URL");
    cmd.env_remove("GATEHOUSE_USE_MOCK_API");
    cmd.env_remove("GATEHOUSE_TIMEOUT_SECS");
    cmd.env("NO_COLOR", "1");
    cmd.output().expect("Failed to execute CLI")
}

/// Run the CLI and expect success, returning stdout.
pub fn run_cli_success(args: &[&str], home: &Path, mock_dir: &Path) -> String {
    let output = run_cli(args, home, mock_dir);
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Run the CLI and expect failure, returning stderr.
pub fn run_cli_failure(args: &[&str], home: &Path, mock_dir: &Path) -> String {
    let output = run_cli(args, home, mock_dir);
    if output.status.success() {
        panic!("CLI command should have failed: {:?}", args);
    }
    String::from_utf8_lossy(&output.stderr).to_string()
}
