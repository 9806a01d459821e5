//! Container runtime access
//!
//! The engine talks to the container runtime only through the
//! [`ContainerRuntime`] trait. [`DockerCli`] implements it by shelling out
//! to the `docker` binary; tests substitute a recording mock.

pub mod docker;
pub mod error;
pub mod preflight;

use crate::core::ImageConfig;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub use docker::{DockerCli, RuntimeConfig};
pub use error::RuntimeError;
pub use preflight::PreflightError;

/// Which stream an output line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Receives command output line by line
pub type OutputSink = Arc<dyn Fn(OutputStream, &str) + Send + Sync>;

/// Operations the engine needs from a container runtime.
///
/// Every call runs to completion before returning.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Start a detached container and return its id
    async fn run_detached(&self, image: &ImageConfig) -> Result<String, RuntimeError>;

    /// Create a directory (with parents) inside the container
    async fn make_dir(&self, container: &str, path: &str) -> Result<(), RuntimeError>;

    /// Copy the contents of a local directory into the container
    async fn copy_into(
        &self,
        container: &str,
        source: &Path,
        destination: &str,
    ) -> Result<(), RuntimeError>;

    /// Run one shell command in the container and return its exit code
    async fn exec(
        &self,
        container: &str,
        workdir: &str,
        command: &str,
        sink: &OutputSink,
    ) -> Result<i32, RuntimeError>;

    /// Force-stop and remove the container
    async fn remove(&self, container: &str) -> Result<(), RuntimeError>;

    /// Log in to a registry (`None` is the runtime's default registry)
    async fn login(
        &self,
        registry: Option<&str>,
        username: &str,
        password: &str,
    ) -> Result<(), RuntimeError>;

    /// Log out of a registry, discarding the runtime's output
    async fn logout(&self, registry: Option<&str>) -> Result<(), RuntimeError>;
}
