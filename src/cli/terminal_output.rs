//! Live terminal rendering of execution events
//!
//! `TerminalReporter` prints a header per step (`[1/3] Build`), echoes each
//! command, streams the container's output as it arrives and closes the step
//! with its result. A spinner covers the gap between starting a container
//! and its first command.

use crate::cli::output::{
    create_spinner, format_duration, format_result, result_icon, style, ROCKET,
};
use crate::execution::ExecutionEvent;
use crate::runtime::OutputStream;
use console::Term;
use indicatif::ProgressBar;
use std::io::{self, Write};
use std::sync::Mutex;

/// Renders [`ExecutionEvent`]s to stdout
#[derive(Default)]
pub struct TerminalReporter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_event(&self, event: &ExecutionEvent) {
        match event {
            ExecutionEvent::PipelineStarted {
                execution_id,
                pipeline,
                total_steps,
            } => {
                println!(
                    "{} Running pipeline {} ({} steps, {})",
                    ROCKET,
                    style(pipeline).bold(),
                    style(total_steps).cyan(),
                    style(&execution_id.to_string()[..8]).dim()
                );
            }
            ExecutionEvent::StepStarted {
                index,
                total,
                name,
                image,
            } => {
                self.print_separator();
                self.print_step_header(index + 1, *total, name);
                self.start_spinner(format!("Starting {}", image));
            }
            ExecutionEvent::CommandStarted { command, .. } => {
                self.stop_spinner();
                println!("{} {}", style("+").cyan(), style(command).bold());
            }
            ExecutionEvent::CommandOutput { stream, line, .. } => match stream {
                OutputStream::Stdout => println!("{}", line),
                OutputStream::Stderr => println!("{}", style(line).yellow()),
            },
            ExecutionEvent::StepFinished {
                name,
                result,
                duration,
                ..
            } => {
                self.stop_spinner();
                println!(
                    "{}{} {} {}",
                    result_icon(result),
                    style(name).bold(),
                    format_result(result),
                    style(format_duration(*duration)).dim()
                );
            }
            ExecutionEvent::PipelineCompleted { .. } => {
                self.print_separator();
            }
        }
        self.flush_stdout();
    }

    fn print_step_header(&self, step_num: usize, total: usize, name: &str) {
        println!(
            "[{} / {}] {}",
            style(step_num).cyan(),
            style(total).dim(),
            style(name).bold()
        );
    }

    fn print_separator(&self) {
        let (_, width) = Term::stdout().size_checked().unwrap_or((24, 80));
        println!("{}", style("─".repeat(width as usize)).dim());
    }

    fn start_spinner(&self, message: String) {
        let mut spinner = self.spinner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = spinner.replace(create_spinner(message)) {
            previous.finish_and_clear();
        }
    }

    fn stop_spinner(&self) {
        let mut spinner = self.spinner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(spinner) = spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn flush_stdout(&self) {
        let _ = io::stdout().flush();
    }
}
