//! Test: choosing a pipeline by branch, tag, pull request or custom name

use crate::helpers::*;
use local_pipelines::core::PipelineSelector;
use local_pipelines::execution::EngineOptions;

const YAML: &str = r#"
pipelines:
  default:
    - step:
        script: [default]
  branches:
    main:
      - step:
          script: [main]
    "feature/*":
      - step:
          script: [feature]
    "**":
      - step:
          script: [any branch]
  tags:
    "v*":
      - step:
          script: [release]
  pull-requests:
    "**":
      - step:
          script: [pull request]
  custom:
    deploy:
      - step:
          script: [deploy]
"#;

async fn commands_for(selector: PipelineSelector) -> Vec<String> {
    let runtime = MockRuntime::new();
    run_pipeline(YAML, &selector, EngineOptions::default(), &runtime)
        .await
        .unwrap();
    runtime.commands()
}

#[tokio::test]
async fn test_exact_branch_wins() {
    assert_eq!(commands_for(PipelineSelector::Branch("main".into())).await, vec!["main"]);
}

#[tokio::test]
async fn test_glob_branches() {
    assert_eq!(
        commands_for(PipelineSelector::Branch("feature/login".into())).await,
        vec!["feature"]
    );
    // `*` stays within one segment, so `**` catches the nested branch
    assert_eq!(
        commands_for(PipelineSelector::Branch("feature/a/b".into())).await,
        vec!["any branch"]
    );
}

#[tokio::test]
async fn test_tags_and_pull_requests() {
    assert_eq!(commands_for(PipelineSelector::Tag("v1.2.0".into())).await, vec!["release"]);
    assert_eq!(
        commands_for(PipelineSelector::PullRequest("fix/typo".into())).await,
        vec!["pull request"]
    );
}

#[tokio::test]
async fn test_default_and_custom() {
    assert_eq!(commands_for(PipelineSelector::Default).await, vec!["default"]);
    assert_eq!(commands_for(PipelineSelector::Custom("deploy".into())).await, vec!["deploy"]);
}

#[tokio::test]
async fn test_custom_names_are_not_patterns() {
    let runtime = MockRuntime::new();
    let result = run_pipeline(
        YAML,
        &PipelineSelector::Custom("dep*".into()),
        EngineOptions::default(),
        &runtime,
    )
    .await;
    assert!(result.is_err());
}
