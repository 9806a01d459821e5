//! Resolved execution plan for one pipeline

use crate::core::{
    config::{ConfigError, ExecutionOptions, PipelineDocument, PipelineSelector},
    image::{resolve_image, ImageConfig, ImageRef},
    step::{flatten, resolve_steps, Leaf, StepNode},
};
use serde::Serialize;

/// Everything needed to execute the selected pipeline
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub selector: PipelineSelector,

    /// Document-level image, inherited by steps without an override
    pub image: ImageConfig,

    pub options: ExecutionOptions,

    pub steps: Vec<StepNode>,
}

/// One leaf of the plan as shown by `validate`
#[derive(Debug, Clone, Serialize)]
pub struct PlannedStep {
    pub index: usize,
    pub name: String,
    pub image: ImageConfig,
    pub max_time: f64,
    pub script: Vec<String>,
}

impl ExecutionPlan {
    /// Resolve the document image, options and the selected step tree.
    ///
    /// Fails before any container work when the selector does not exist.
    pub fn resolve(
        document: &PipelineDocument,
        selector: &PipelineSelector,
    ) -> Result<Self, ConfigError> {
        let body = document.select(selector)?;

        let image = resolve_image(
            document.image().and_then(ImageRef::from_value).as_ref(),
            &ImageConfig::system_default(),
        );

        Ok(Self {
            selector: selector.clone(),
            image,
            options: ExecutionOptions::from_value(document.options()),
            steps: resolve_steps(Some(body)),
        })
    }

    /// Leaves in execution order
    pub fn leaves(&self) -> Vec<&Leaf> {
        flatten(&self.steps)
    }

    /// Effective time budget for a leaf, in minutes
    pub fn max_time_for(&self, leaf: &Leaf) -> f64 {
        leaf.max_time.unwrap_or(self.options.max_time)
    }

    /// Describe each leaf with its resolved image and budget
    pub fn describe(&self) -> Vec<PlannedStep> {
        self.leaves()
            .into_iter()
            .enumerate()
            .map(|(index, leaf)| PlannedStep {
                index,
                name: leaf.label(index),
                image: resolve_image(leaf.image.as_ref(), &self.image),
                max_time: self.max_time_for(leaf),
                script: leaf.script.clone(),
            })
            .collect()
    }
}
