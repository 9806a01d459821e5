//! Main execution engine - orchestrates the entire pipeline run

use crate::{
    core::{
        image::resolve_image, ConfigError, ExecutionPlan, ExecutionStatus, ImageConfig, Leaf,
        PipelineDocument, PipelineSelector, RunReport, RunResult, StepReport,
    },
    execution::{
        auth::RegistryAuth,
        container::{CommandObserver, ContainerManager, FailurePolicy},
        supervisor::{Supervised, TimeoutSupervisor},
    },
    runtime::{ContainerRuntime, OutputSink, OutputStream},
};
use chrono::Utc;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events that can occur during pipeline execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        execution_id: Uuid,
        pipeline: PipelineSelector,
        total_steps: usize,
    },
    StepStarted {
        index: usize,
        total: usize,
        name: String,
        image: String,
    },
    CommandStarted {
        index: usize,
        command: String,
    },
    CommandOutput {
        index: usize,
        stream: OutputStream,
        line: String,
    },
    StepFinished {
        index: usize,
        name: String,
        result: RunResult,
        duration: Duration,
    },
    PipelineCompleted {
        execution_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

type Handlers = Arc<Mutex<Vec<EventHandler>>>;

/// Run-wide engine switches
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    /// Log in to registries for steps whose image carries credentials
    pub authorize: bool,

    pub failure_policy: FailurePolicy,
}

/// Main pipeline execution engine.
///
/// Steps run one at a time in document order, including the children of
/// parallel groups. A step's outcome never stops the steps after it.
pub struct ExecutionEngine {
    containers: ContainerManager,
    auth: RegistryAuth,
    options: EngineOptions,
    event_handlers: Handlers,
}

impl ExecutionEngine {
    pub fn new<R: ContainerRuntime + 'static>(runtime: R, options: EngineOptions) -> Self {
        Self::with_runtime(Arc::new(runtime), options)
    }

    pub fn with_runtime(runtime: Arc<dyn ContainerRuntime>, options: EngineOptions) -> Self {
        Self {
            containers: ContainerManager::new(runtime.clone()),
            auth: RegistryAuth::new(runtime, options.authorize),
            options,
            event_handlers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::new(handler));
    }

    fn emit_event(&self, event: ExecutionEvent) {
        dispatch(&self.event_handlers, event);
    }

    /// Select a pipeline from the document and execute it.
    ///
    /// Configuration errors are returned before any runtime call is made.
    pub async fn execute(
        &self,
        document: &PipelineDocument,
        selector: &PipelineSelector,
        working_dir: &Path,
    ) -> Result<RunReport, ConfigError> {
        let plan = ExecutionPlan::resolve(document, selector)?;
        Ok(self.execute_plan(&plan, working_dir).await)
    }

    /// Execute an already resolved plan
    pub async fn execute_plan(&self, plan: &ExecutionPlan, working_dir: &Path) -> RunReport {
        let execution_id = Uuid::new_v4();
        let started_at = Utc::now();
        let leaves = plan.leaves();
        let total = leaves.len();

        info!("Starting pipeline {} ({}), {} steps", plan.selector, execution_id, total);
        self.emit_event(ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline: plan.selector.clone(),
            total_steps: total,
        });

        self.auth.reset().await;

        let mut steps = Vec::with_capacity(total);
        for (index, leaf) in leaves.into_iter().enumerate() {
            steps.push(self.execute_step(plan, leaf, index, total, working_dir).await);
        }

        self.auth.reset().await;

        let report = RunReport::new(execution_id, plan.selector.clone(), started_at, steps);
        info!("Pipeline {} finished: {:?}", plan.selector, report.status);
        self.emit_event(ExecutionEvent::PipelineCompleted {
            execution_id,
            status: report.status,
        });

        report
    }

    /// Execute a single leaf
    async fn execute_step(
        &self,
        plan: &ExecutionPlan,
        leaf: &Leaf,
        index: usize,
        total: usize,
        working_dir: &Path,
    ) -> StepReport {
        let name = leaf.label(index);
        let image = resolve_image(leaf.image.as_ref(), &plan.image);
        let supervisor = TimeoutSupervisor::from_minutes(plan.max_time_for(leaf));

        info!("Executing step {}/{}: {} ({})", index + 1, total, name, image.name);
        self.emit_event(ExecutionEvent::StepStarted {
            index,
            total,
            name: name.clone(),
            image: image.name.clone(),
        });

        let started = Instant::now();
        let result = self
            .run_in_container(leaf, index, &image, supervisor, working_dir)
            .await;
        let duration = started.elapsed();

        match &result {
            RunResult::Completed => info!("Step {} completed", name),
            RunResult::TimedOut => warn!("Step {} timed out after {:?}", name, supervisor.limit()),
            RunResult::CommandFailed { exit_code } => {
                warn!("Step {} failed with exit code {}", name, exit_code)
            }
            RunResult::Errored { message } => error!("Step {} errored: {}", name, message),
        }

        self.emit_event(ExecutionEvent::StepFinished {
            index,
            name: name.clone(),
            result: result.clone(),
            duration,
        });

        StepReport {
            index,
            name,
            image,
            result,
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Login, start, supervised commands, logout, teardown.
    ///
    /// Nothing after a successful start returns early, so the container is
    /// always torn down.
    async fn run_in_container(
        &self,
        leaf: &Leaf,
        index: usize,
        image: &ImageConfig,
        supervisor: TimeoutSupervisor,
        working_dir: &Path,
    ) -> RunResult {
        let session = match self.auth.login(image).await {
            Ok(session) => session,
            Err(e) => {
                return RunResult::Errored {
                    message: format!("Registry login failed: {}", e),
                }
            }
        };

        let handle = self.containers.start(image, working_dir).await;

        let result = match &handle {
            Err(e) => RunResult::Errored {
                message: format!("Failed to start container from {}: {}", image.name, e),
            },
            Ok(handle) => {
                let runner = self
                    .containers
                    .command_runner(handle, self.options.failure_policy, self.output_sink(index))
                    .on_command(self.command_observer(index));
                let cancel = runner.cancel_flag();

                match supervisor.run(runner.run(leaf.script.clone())).await {
                    Supervised::Finished(Ok(result)) => result,
                    Supervised::Finished(Err(e)) => RunResult::Errored {
                        message: e.to_string(),
                    },
                    Supervised::Crashed(message) => RunResult::Errored { message },
                    Supervised::TimedOut => {
                        cancel.store(true, Ordering::SeqCst);
                        RunResult::TimedOut
                    }
                }
            }
        };

        if let Some(session) = session {
            if let Err(e) = self.auth.logout(session).await {
                warn!("Registry logout failed: {}", e);
            }
        }

        if let Ok(handle) = handle {
            if let Err(e) = self.containers.teardown(handle).await {
                warn!("Failed to remove container: {}", e);
            }
        }

        result
    }

    fn output_sink(&self, index: usize) -> OutputSink {
        let handlers = self.event_handlers.clone();
        Arc::new(move |stream: OutputStream, line: &str| {
            dispatch(
                &handlers,
                ExecutionEvent::CommandOutput {
                    index,
                    stream,
                    line: line.to_string(),
                },
            );
        })
    }

    fn command_observer(&self, index: usize) -> CommandObserver {
        let handlers = self.event_handlers.clone();
        Arc::new(move |command: &str| {
            info!("+ {}", command);
            dispatch(
                &handlers,
                ExecutionEvent::CommandStarted {
                    index,
                    command: command.to_string(),
                },
            );
        })
    }
}

/// Emit an event to all handlers
fn dispatch(handlers: &Mutex<Vec<EventHandler>>, event: ExecutionEvent) {
    let handlers: Vec<EventHandler> = handlers
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone();
    for handler in &handlers {
        handler(event.clone());
    }
}
