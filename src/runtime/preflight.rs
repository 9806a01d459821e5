//! Checks that must pass before any container work starts

use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Version-control binary used to validate the target directory
pub const GIT_BINARY: &str = "git";

#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("Required binary '{binary}' was not found or did not run")]
    MissingBinary { binary: String },

    #[error("'{}' is not a git repository", path.display())]
    NotARepository { path: PathBuf },
}

/// Check that `binary --version` runs successfully
pub async fn check_binary(binary: &str) -> Result<(), PreflightError> {
    debug!("Checking for {}", binary);
    let status = Command::new(binary)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match status {
        Ok(status) if status.success() => Ok(()),
        _ => Err(PreflightError::MissingBinary {
            binary: binary.to_string(),
        }),
    }
}

/// Check that `directory` is inside a git work tree
pub async fn check_repository(directory: &Path) -> Result<(), PreflightError> {
    let output = Command::new(GIT_BINARY)
        .arg("-C")
        .arg(directory)
        .args(["rev-parse", "--is-inside-work-tree"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await;

    match output {
        Ok(output) if output.status.success() && output.stdout.starts_with(b"true") => Ok(()),
        _ => Err(PreflightError::NotARepository {
            path: directory.to_path_buf(),
        }),
    }
}

/// Run every check needed before executing a pipeline in `directory`
pub async fn preflight(runtime_binary: &str, directory: &Path) -> Result<(), PreflightError> {
    check_binary(runtime_binary).await?;
    check_binary(GIT_BINARY).await?;
    check_repository(directory).await
}
