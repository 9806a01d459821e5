//! Test utilities: a recording container runtime and run helpers

#![allow(dead_code)]

use async_trait::async_trait;
use local_pipelines::core::{ConfigError, PipelineDocument, PipelineSelector, RunReport, RunResult};
use local_pipelines::execution::{EngineOptions, ExecutionEngine, ExecutionEvent};
use local_pipelines::{ContainerRuntime, ImageConfig, OutputSink, OutputStream, RuntimeError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One call made against the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeOp {
    Run { image: String, user: Option<String> },
    MakeDir { container: String, path: String },
    Copy { container: String, source: PathBuf, destination: String },
    Exec { container: String, workdir: String, command: String },
    Remove { container: String },
    Login { registry: Option<String>, username: String },
    Logout { registry: Option<String> },
}

#[derive(Default)]
struct MockState {
    ops: Mutex<Vec<RuntimeOp>>,
    next_id: AtomicUsize,
    exit_codes: Mutex<HashMap<String, i32>>,
    delays: Mutex<HashMap<String, Duration>>,
    output: Mutex<HashMap<String, Vec<(OutputStream, String)>>>,
    failing_exec: Mutex<HashSet<String>>,
    panicking_exec: Mutex<HashSet<String>>,
    fail_run: AtomicBool,
    fail_copy: AtomicBool,
    fail_login: AtomicBool,
}

/// Container runtime that records every call and answers from a script.
///
/// Commands exit 0 unless configured otherwise. Cloning shares the record.
#[derive(Clone, Default)]
pub struct MockRuntime {
    state: Arc<MockState>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exit_code(self, command: &str, code: i32) -> Self {
        self.state.exit_codes.lock().unwrap().insert(command.to_string(), code);
        self
    }

    pub fn with_delay(self, command: &str, delay: Duration) -> Self {
        self.state.delays.lock().unwrap().insert(command.to_string(), delay);
        self
    }

    pub fn with_output(self, command: &str, stream: OutputStream, line: &str) -> Self {
        self.state
            .output
            .lock()
            .unwrap()
            .entry(command.to_string())
            .or_default()
            .push((stream, line.to_string()));
        self
    }

    /// `exec` of this command fails at the runtime level
    pub fn failing_exec(self, command: &str) -> Self {
        self.state.failing_exec.lock().unwrap().insert(command.to_string());
        self
    }

    /// `exec` of this command panics
    pub fn panicking_exec(self, command: &str) -> Self {
        self.state.panicking_exec.lock().unwrap().insert(command.to_string());
        self
    }

    pub fn failing_run(self) -> Self {
        self.state.fail_run.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_copy(self) -> Self {
        self.state.fail_copy.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_login(self) -> Self {
        self.state.fail_login.store(true, Ordering::SeqCst);
        self
    }

    pub fn ops(&self) -> Vec<RuntimeOp> {
        self.state.ops.lock().unwrap().clone()
    }

    /// Commands executed, in order
    pub fn commands(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                RuntimeOp::Exec { command, .. } => Some(command),
                _ => None,
            })
            .collect()
    }

    /// Images started, in order
    pub fn images(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                RuntimeOp::Run { image, .. } => Some(image),
                _ => None,
            })
            .collect()
    }

    /// Containers successfully started
    pub fn started(&self) -> usize {
        self.state.next_id.load(Ordering::SeqCst)
    }

    pub fn removed(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                RuntimeOp::Remove { container } => Some(container),
                _ => None,
            })
            .collect()
    }

    pub fn logins(&self) -> Vec<RuntimeOp> {
        self.ops()
            .into_iter()
            .filter(|op| matches!(op, RuntimeOp::Login { .. } | RuntimeOp::Logout { .. }))
            .collect()
    }

    fn record(&self, op: RuntimeOp) {
        self.state.ops.lock().unwrap().push(op);
    }

    fn failure(operation: &'static str) -> RuntimeError {
        RuntimeError::CommandFailed {
            operation,
            code: 1,
            stderr: "mock failure".to_string(),
        }
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn run_detached(&self, image: &ImageConfig) -> Result<String, RuntimeError> {
        self.record(RuntimeOp::Run {
            image: image.name.clone(),
            user: image.run_as_user.clone(),
        });
        if self.state.fail_run.load(Ordering::SeqCst) {
            return Err(Self::failure("docker run"));
        }
        let id = self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("container-{}", id))
    }

    async fn make_dir(&self, container: &str, path: &str) -> Result<(), RuntimeError> {
        self.record(RuntimeOp::MakeDir {
            container: container.to_string(),
            path: path.to_string(),
        });
        Ok(())
    }

    async fn copy_into(
        &self,
        container: &str,
        source: &Path,
        destination: &str,
    ) -> Result<(), RuntimeError> {
        self.record(RuntimeOp::Copy {
            container: container.to_string(),
            source: source.to_path_buf(),
            destination: destination.to_string(),
        });
        if self.state.fail_copy.load(Ordering::SeqCst) {
            return Err(Self::failure("docker cp"));
        }
        Ok(())
    }

    async fn exec(
        &self,
        container: &str,
        workdir: &str,
        command: &str,
        sink: &OutputSink,
    ) -> Result<i32, RuntimeError> {
        self.record(RuntimeOp::Exec {
            container: container.to_string(),
            workdir: workdir.to_string(),
            command: command.to_string(),
        });

        let delay = self.state.delays.lock().unwrap().get(command).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let panics = self.state.panicking_exec.lock().unwrap().contains(command);
        if panics {
            panic!("mock runtime panicked on {}", command);
        }

        if self.state.failing_exec.lock().unwrap().contains(command) {
            return Err(Self::failure("docker exec"));
        }

        let lines = self.state.output.lock().unwrap().get(command).cloned().unwrap_or_default();
        for (stream, line) in lines {
            sink(stream, &line);
        }

        Ok(self.state.exit_codes.lock().unwrap().get(command).copied().unwrap_or(0))
    }

    async fn remove(&self, container: &str) -> Result<(), RuntimeError> {
        self.record(RuntimeOp::Remove {
            container: container.to_string(),
        });
        Ok(())
    }

    async fn login(
        &self,
        registry: Option<&str>,
        username: &str,
        _password: &str,
    ) -> Result<(), RuntimeError> {
        self.record(RuntimeOp::Login {
            registry: registry.map(str::to_string),
            username: username.to_string(),
        });
        if self.state.fail_login.load(Ordering::SeqCst) {
            return Err(Self::failure("docker login"));
        }
        Ok(())
    }

    async fn logout(&self, registry: Option<&str>) -> Result<(), RuntimeError> {
        self.record(RuntimeOp::Logout {
            registry: registry.map(str::to_string),
        });
        Ok(())
    }
}

/// Directory handed to the engine; the mock never reads it
pub fn source_dir() -> PathBuf {
    PathBuf::from("/tmp/local-pipelines-source")
}

/// Run the default pipeline of `yaml` with default options
pub async fn run_default(yaml: &str, runtime: &MockRuntime) -> RunReport {
    run_pipeline(yaml, &PipelineSelector::Default, EngineOptions::default(), runtime)
        .await
        .expect("document should resolve")
}

/// Load `yaml` and run the selected pipeline against the mock
pub async fn run_pipeline(
    yaml: &str,
    selector: &PipelineSelector,
    options: EngineOptions,
    runtime: &MockRuntime,
) -> Result<RunReport, ConfigError> {
    let document = PipelineDocument::from_yaml(yaml)?;
    let engine = ExecutionEngine::new(runtime.clone(), options);
    engine.execute(&document, selector, &source_dir()).await
}

/// Run the default pipeline and collect every emitted event
pub async fn run_collecting_events(
    yaml: &str,
    runtime: &MockRuntime,
) -> (RunReport, Vec<ExecutionEvent>) {
    let document = PipelineDocument::from_yaml(yaml).expect("valid document");
    let engine = ExecutionEngine::new(runtime.clone(), EngineOptions::default());

    let events = Arc::new(Mutex::new(Vec::new()));
    let captured = events.clone();
    engine.add_event_handler(move |event| captured.lock().unwrap().push(event));

    let report = engine
        .execute(&document, &PipelineSelector::Default, &source_dir())
        .await
        .expect("document should resolve");
    let events = events.lock().unwrap().clone();
    (report, events)
}

/// Results of a report, in order
pub fn results(report: &RunReport) -> Vec<RunResult> {
    report.steps.iter().map(|s| s.result.clone()).collect()
}

/// Assert every started container was removed exactly once
pub fn assert_each_container_removed_once(runtime: &MockRuntime) {
    let started = runtime.started();
    let removed = runtime.removed();
    let unique: HashSet<_> = removed.iter().collect();
    assert_eq!(unique.len(), removed.len(), "container removed twice: {:?}", removed);
    assert_eq!(
        removed.len(),
        started,
        "started {} containers but removed {:?}",
        started,
        removed
    );
}
