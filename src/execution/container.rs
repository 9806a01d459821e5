//! Container lifecycle - start and stage, run commands, tear down

use crate::core::{expand::expand_vars, ImageConfig, RunResult};
use crate::runtime::{ContainerRuntime, OutputSink, OutputStream, RuntimeError};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Directory inside every step container that holds the staged sources
pub const BUILD_DIR: &str = "/opt/atlassian/pipelines/agent/build";

/// What to do when a script command exits non-zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the step at the first failing command
    #[default]
    Halt,
    /// Run every command regardless of exit status
    Ignore,
}

/// Callback invoked with each expanded command before it runs
pub type CommandObserver = Arc<dyn Fn(&str) + Send + Sync>;

/// A running step container.
///
/// Released through [`ContainerManager::teardown`]. A handle dropped without
/// teardown (for example while unwinding) schedules its own removal.
pub struct ContainerHandle {
    id: String,
    runtime: Arc<dyn ContainerRuntime>,
    released: bool,
}

impl ContainerHandle {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Debug for ContainerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerHandle")
            .field("id", &self.id)
            .field("released", &self.released)
            .finish()
    }
}

impl Drop for ContainerHandle {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let id = std::mem::take(&mut self.id);
        warn!("Container {} dropped without teardown, removing it", id);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let runtime = self.runtime.clone();
                handle.spawn(async move {
                    if let Err(e) = runtime.remove(&id).await {
                        warn!("Failed to remove container {}: {}", id, e);
                    }
                });
            }
            Err(_) => warn!("No async runtime available; container {} was left running", id),
        }
    }
}

/// Starts, stages and removes step containers
#[derive(Clone)]
pub struct ContainerManager {
    runtime: Arc<dyn ContainerRuntime>,
}

impl ContainerManager {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }

    /// Start a detached container from `image` and copy `working_dir` into
    /// [`BUILD_DIR`].
    ///
    /// If staging fails the container is removed before the error is returned.
    pub async fn start(
        &self,
        image: &ImageConfig,
        working_dir: &Path,
    ) -> Result<ContainerHandle, RuntimeError> {
        info!("Starting container from {}", image.name);
        let id = self.runtime.run_detached(image).await?;
        debug!("Started container {}", id);

        let handle = ContainerHandle {
            id,
            runtime: self.runtime.clone(),
            released: false,
        };

        if let Err(e) = self.stage(&handle, working_dir).await {
            if let Err(cleanup) = self.teardown(handle).await {
                warn!("Failed to remove container after staging error: {}", cleanup);
            }
            return Err(e);
        }

        Ok(handle)
    }

    async fn stage(&self, handle: &ContainerHandle, working_dir: &Path) -> Result<(), RuntimeError> {
        self.runtime.make_dir(&handle.id, BUILD_DIR).await?;
        self.runtime.copy_into(&handle.id, working_dir, BUILD_DIR).await?;
        debug!("Staged {} into {}:{}", working_dir.display(), handle.id, BUILD_DIR);
        Ok(())
    }

    /// Build a runner for the container's commands.
    ///
    /// The runner owns everything it needs so it can be moved onto another
    /// task.
    pub fn command_runner(
        &self,
        handle: &ContainerHandle,
        policy: FailurePolicy,
        sink: OutputSink,
    ) -> CommandRunner {
        CommandRunner {
            runtime: self.runtime.clone(),
            container: handle.id.clone(),
            policy,
            sink,
            observer: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Force-stop and remove the container. Consumes the handle so it can
    /// only happen once.
    pub async fn teardown(&self, mut handle: ContainerHandle) -> Result<(), RuntimeError> {
        handle.released = true;
        info!("Removing container {}", handle.id);
        self.runtime.remove(&handle.id).await
    }
}

/// Runs a step's commands, in order, inside one container
#[derive(Clone)]
pub struct CommandRunner {
    runtime: Arc<dyn ContainerRuntime>,
    container: String,
    policy: FailurePolicy,
    sink: OutputSink,
    observer: Option<CommandObserver>,
    cancelled: Arc<AtomicBool>,
}

impl CommandRunner {
    /// Observe each command line (after expansion) before it runs
    pub fn on_command(mut self, observer: CommandObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Flag that stops the runner before its next command and mutes its
    /// output once set
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// Run every command through the runtime's exec channel.
    ///
    /// Each command line is expanded against the environment first. With
    /// [`FailurePolicy::Ignore`] exit codes are not acted on.
    pub async fn run(self, commands: Vec<String>) -> Result<RunResult, RuntimeError> {
        let cancelled = self.cancelled.clone();
        let sink = self.sink.clone();
        let muted: OutputSink = Arc::new(move |stream: OutputStream, line: &str| {
            if !cancelled.load(Ordering::SeqCst) {
                sink(stream, line);
            }
        });

        for command in commands {
            if self.cancelled.load(Ordering::SeqCst) {
                debug!("Runner for {} cancelled, skipping remaining commands", self.container);
                break;
            }

            let command = expand_vars(&command);
            if let Some(observer) = &self.observer {
                observer(&command);
            }

            let code = self
                .runtime
                .exec(&self.container, BUILD_DIR, &command, &muted)
                .await?;

            if code != 0 {
                match self.policy {
                    FailurePolicy::Halt => {
                        warn!("Command exited with code {}: {}", code, command);
                        return Ok(RunResult::CommandFailed { exit_code: code });
                    }
                    FailurePolicy::Ignore => {
                        debug!("Ignoring exit code {} of: {}", code, command);
                    }
                }
            }
        }

        Ok(RunResult::Completed)
    }
}
