//! Test: configuration errors abort before any container work

use crate::helpers::*;
use local_pipelines::core::{ConfigError, PipelineSelector};
use local_pipelines::execution::EngineOptions;

#[tokio::test]
async fn test_missing_pipelines_property() {
    let runtime = MockRuntime::new();
    let err = run_pipeline(
        "image: alpine\n",
        &PipelineSelector::Default,
        EngineOptions::default(),
        &runtime,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ConfigError::MissingPipelines));
    assert_eq!(err.to_string(), "Missing required property 'pipelines'");
    assert!(runtime.ops().is_empty());
}

#[tokio::test]
async fn test_missing_default_section() {
    let yaml = r#"
pipelines:
  branches:
    main:
      - step:
          script: [echo main]
"#;
    let runtime = MockRuntime::new();
    let err = run_pipeline(yaml, &PipelineSelector::Default, EngineOptions::default(), &runtime)
        .await
        .unwrap_err();

    assert!(matches!(err, ConfigError::MissingSection { section: "default" }));
    assert!(runtime.ops().is_empty());
}

#[tokio::test]
async fn test_missing_named_pipeline() {
    let yaml = r#"
pipelines:
  custom:
    deploy:
      - step:
          script: [./deploy.sh]
"#;
    let runtime = MockRuntime::new();
    let err = run_pipeline(
        yaml,
        &PipelineSelector::Custom("rollback".into()),
        EngineOptions {
            authorize: true,
            ..EngineOptions::default()
        },
        &runtime,
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        ConfigError::MissingPipeline { section: "custom", ref name } if name == "rollback"
    ));
    // not even the pre-run logout happens
    assert!(runtime.ops().is_empty());
}

#[tokio::test]
async fn test_malformed_yaml() {
    let runtime = MockRuntime::new();
    let err = run_pipeline(
        "pipelines: [unclosed",
        &PipelineSelector::Default,
        EngineOptions::default(),
        &runtime,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ConfigError::Parse(_)));
    assert!(runtime.ops().is_empty());
}
