//! Test: what happens after a command exits non-zero

use crate::helpers::*;
use local_pipelines::core::{ExecutionStatus, PipelineSelector, RunResult};
use local_pipelines::execution::{EngineOptions, FailurePolicy};

const YAML: &str = r#"
pipelines:
  default:
    - step:
        script: [lint, "false", build]
    - step:
        script: [deploy]
"#;

#[tokio::test]
async fn test_halt_stops_the_step_only() {
    let runtime = MockRuntime::new().with_exit_code("false", 1);
    let report = run_default(YAML, &runtime).await;

    assert_eq!(
        results(&report),
        vec![RunResult::CommandFailed { exit_code: 1 }, RunResult::Completed]
    );
    assert_eq!(runtime.commands(), vec!["lint", "false", "deploy"]);
    assert_eq!(report.status, ExecutionStatus::Failed);
}

#[tokio::test]
async fn test_ignore_runs_every_command() {
    let runtime = MockRuntime::new().with_exit_code("false", 1);
    let options = EngineOptions {
        failure_policy: FailurePolicy::Ignore,
        ..EngineOptions::default()
    };
    let report = run_pipeline(YAML, &PipelineSelector::Default, options, &runtime)
        .await
        .unwrap();

    assert_eq!(results(&report), vec![RunResult::Completed, RunResult::Completed]);
    assert_eq!(runtime.commands(), vec!["lint", "false", "build", "deploy"]);
    assert!(report.succeeded());
}
