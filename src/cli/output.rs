//! CLI output formatting

use crate::core::{ExecutionStatus, PipelineSelector, PlannedStep, RunReport, RunResult};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a spinner shown while a step container starts
pub fn create_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(template);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format a step result for display
pub fn format_result(result: &RunResult) -> String {
    match result {
        RunResult::Completed => style("COMPLETED").green().to_string(),
        RunResult::TimedOut => style("TIMED OUT").yellow().to_string(),
        RunResult::CommandFailed { exit_code } => {
            style(format!("FAILED (exit code {})", exit_code)).red().to_string()
        }
        RunResult::Errored { message } => {
            format!("{}: {}", style("ERROR").red(), style(message).dim())
        }
    }
}

/// Icon for a step result
pub fn result_icon(result: &RunResult) -> Emoji<'static, 'static> {
    match result {
        RunResult::Completed => CHECK,
        RunResult::TimedOut => WARN,
        RunResult::CommandFailed { .. } | RunResult::Errored { .. } => CROSS,
    }
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Format a duration as `1.2s`, `3m 4s` or `1h 2m 3s`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.1}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Final summary table of a run
pub fn format_report(report: &RunReport) -> String {
    let mut lines = vec![format!(
        "{} Pipeline {} ({}) {}",
        INFO,
        style(&report.pipeline).bold(),
        style(&report.execution_id.to_string()[..8]).dim(),
        format_status(report.status)
    )];

    for step in &report.steps {
        lines.push(format!(
            "  {}{} {} {}",
            result_icon(&step.result),
            style(&step.name).bold(),
            format_result(&step.result),
            style(format_duration(Duration::from_millis(step.duration_ms))).dim()
        ));
    }

    lines.join("\n")
}

/// Resolved plan as shown by `validate`
pub fn format_plan(selector: &PipelineSelector, steps: &[PlannedStep]) -> String {
    let mut lines = vec![format!(
        "  Pipeline: {} ({} steps)",
        style(selector).bold(),
        style(steps.len()).cyan()
    )];

    for step in steps {
        lines.push(format!(
            "  [{}] {} on {} (max {} min)",
            step.index + 1,
            style(&step.name).bold(),
            style(&step.image.name).cyan(),
            step.max_time
        ));
        for command in &step.script {
            lines.push(format!("      {}", style(command).dim()));
        }
    }

    lines.join("\n")
}
