//! local-pipelines - run Bitbucket-style pipeline documents locally, one
//! container per step

pub mod cli;
pub mod core;
pub mod execution;
pub mod runtime;

// Re-export commonly used types
pub use core::{
    ConfigError, ExecutionPlan, ExecutionStatus, ImageConfig, PipelineDocument, PipelineSelector,
    RunReport, RunResult,
};
pub use execution::{EngineOptions, ExecutionEngine, ExecutionEvent, FailurePolicy};
pub use runtime::{ContainerRuntime, DockerCli, OutputSink, OutputStream, RuntimeConfig, RuntimeError};
