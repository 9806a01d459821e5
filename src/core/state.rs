//! Step outcomes and run reports

use crate::core::{config::PipelineSelector, image::ImageConfig};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Outcome of one leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunResult {
    /// Every command ran
    Completed,
    /// The time budget elapsed; the container was torn down
    TimedOut,
    /// A command exited non-zero and the step stopped there
    CommandFailed { exit_code: i32 },
    /// The runtime failed (start, staging, exec); the step did not finish
    Errored { message: String },
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        matches!(self, RunResult::Completed)
    }
}

/// Overall status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExecutionStatus {
    /// Every step completed
    Completed,
    /// At least one step timed out, failed or errored
    Failed,
}

/// Record of one executed leaf
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub name: String,
    pub image: ImageConfig,
    pub result: RunResult,
    pub duration_ms: u64,
}

/// Record of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub execution_id: Uuid,
    pub pipeline: PipelineSelector,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub steps: Vec<StepReport>,
}

impl RunReport {
    /// Build a report, deriving the status from the step results
    pub fn new(
        execution_id: Uuid,
        pipeline: PipelineSelector,
        started_at: DateTime<Utc>,
        steps: Vec<StepReport>,
    ) -> Self {
        let status = if steps.iter().all(|s| s.result.is_success()) {
            ExecutionStatus::Completed
        } else {
            ExecutionStatus::Failed
        };

        Self {
            execution_id,
            pipeline,
            status,
            started_at,
            finished_at: Utc::now(),
            steps,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }
}
