//! Scenario-based tests for local-pipelines

mod config_errors;
mod failure_policy;
mod idempotence;
mod selectors;
