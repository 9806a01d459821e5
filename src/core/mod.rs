//! Core domain models
//!
//! This module defines the pipeline document, the step tree, image
//! resolution and the outcome types produced by a run.

pub mod config;
pub mod expand;
pub mod image;
pub mod plan;
pub mod state;
pub mod step;

pub use config::{ConfigError, ExecutionOptions, PipelineDocument, PipelineSelector};
pub use image::{ImageConfig, ImageRef};
pub use plan::{ExecutionPlan, PlannedStep};
pub use state::{ExecutionStatus, RunReport, RunResult, StepReport};
pub use step::{Leaf, StepNode};
