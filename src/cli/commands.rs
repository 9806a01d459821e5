//! CLI command definitions

use crate::core::config::DEFAULT_DOCUMENT;
use crate::core::PipelineSelector;
use crate::execution::{EngineOptions, FailurePolicy};
use clap::Args;
use std::path::PathBuf;

/// Where the document and the sources live
#[derive(Debug, Args, Clone)]
pub struct TargetArgs {
    /// Directory staged into every step container
    #[arg(short, long, default_value = ".")]
    pub directory: PathBuf,

    /// Pipeline document (defaults to bitbucket-pipelines.yml in the directory)
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

impl TargetArgs {
    pub fn document_path(&self) -> PathBuf {
        self.file
            .clone()
            .unwrap_or_else(|| self.directory.join(DEFAULT_DOCUMENT))
    }
}

/// Which pipeline to pick; the default pipeline when none is given
#[derive(Debug, Args, Clone, Default)]
#[group(multiple = false)]
pub struct SelectorArgs {
    /// Pipeline for a branch
    #[arg(long)]
    pub branch: Option<String>,

    /// Pipeline for a tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Pipeline for a pull request's source branch
    #[arg(long)]
    pub pull_request: Option<String>,

    /// Custom (manually triggered) pipeline
    #[arg(long)]
    pub custom: Option<String>,
}

impl SelectorArgs {
    pub fn selector(&self) -> PipelineSelector {
        if let Some(name) = &self.branch {
            PipelineSelector::Branch(name.clone())
        } else if let Some(name) = &self.tag {
            PipelineSelector::Tag(name.clone())
        } else if let Some(name) = &self.pull_request {
            PipelineSelector::PullRequest(name.clone())
        } else if let Some(name) = &self.custom {
            PipelineSelector::Custom(name.clone())
        } else {
            PipelineSelector::Default
        }
    }
}

/// Run a pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub selector: SelectorArgs,

    /// Log in to registries for images that carry credentials
    #[arg(long)]
    pub authorize: bool,

    /// Keep running a step's commands after one exits non-zero
    #[arg(long)]
    pub ignore_failures: bool,

    /// Container runtime binary
    #[arg(long, default_value = "docker")]
    pub runtime: String,

    /// Print the run report as JSON instead of live output
    #[arg(long)]
    pub json: bool,
}

impl RunCommand {
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            authorize: self.authorize,
            failure_policy: if self.ignore_failures {
                FailurePolicy::Ignore
            } else {
                FailurePolicy::Halt
            },
        }
    }
}

/// Validate a pipeline document
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub selector: SelectorArgs,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List the pipelines in a document
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
