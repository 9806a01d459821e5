//! Registry authorization around step execution

use crate::core::ImageConfig;
use crate::runtime::{ContainerRuntime, RuntimeError};
use std::sync::Arc;
use tracing::{info, warn};

/// An open registry login made for one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySession {
    /// `None` is the runtime's default registry
    pub registry: Option<String>,
}

/// Logs the runtime in and out of registries when authorization is enabled
#[derive(Clone)]
pub struct RegistryAuth {
    runtime: Arc<dyn ContainerRuntime>,
    enabled: bool,
}

impl RegistryAuth {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, enabled: bool) -> Self {
        Self { runtime, enabled }
    }

    /// Log in for a step's image.
    ///
    /// Returns `None` without touching the runtime when authorization is off
    /// or the image lacks a username or password.
    pub async fn login(&self, image: &ImageConfig) -> Result<Option<RegistrySession>, RuntimeError> {
        if !self.enabled {
            return Ok(None);
        }
        let Some((username, password)) = image.credentials() else {
            return Ok(None);
        };

        let registry = image.registry();
        info!(
            "Logging in to {} as {}",
            registry.unwrap_or("default registry"),
            username
        );
        self.runtime.login(registry, username, password).await?;

        Ok(Some(RegistrySession {
            registry: registry.map(str::to_string),
        }))
    }

    /// Close a session opened by [`login`](Self::login)
    pub async fn logout(&self, session: RegistrySession) -> Result<(), RuntimeError> {
        self.runtime.logout(session.registry.as_deref()).await
    }

    /// Log out of the default registry so no session leaks into or out of a
    /// run. Does nothing when authorization is off.
    pub async fn reset(&self) {
        if !self.enabled {
            return;
        }
        if let Err(e) = self.runtime.logout(None).await {
            warn!("Registry logout failed: {}", e);
        }
    }
}
