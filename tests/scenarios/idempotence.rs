//! Test: repeated runs issue the same container operations

use crate::helpers::*;
use local_pipelines::core::PipelineSelector;
use local_pipelines::execution::EngineOptions;

#[tokio::test]
async fn test_two_runs_issue_identical_operations() {
    let yaml = r#"
image:
  name: registry.example.com/base:1
  username: u
  password: p
pipelines:
  default:
    - step:
        script: [one, two]
    - parallel:
        - step:
            image: alpine:3
            script: [three]
        - step:
            script: [four]
"#;
    let options = EngineOptions {
        authorize: true,
        ..EngineOptions::default()
    };

    let first = MockRuntime::new();
    let second = MockRuntime::new();
    run_pipeline(yaml, &PipelineSelector::Default, options, &first)
        .await
        .unwrap();
    run_pipeline(yaml, &PipelineSelector::Default, options, &second)
        .await
        .unwrap();

    assert!(!first.ops().is_empty());
    assert_eq!(first.ops(), second.ops());
}
