use std::fmt::Display;
use std::time::Duration;

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::plan::TaskKey;
use crate::Result;

#[derive(PartialEq, Eq)]
pub enum StepStatus {
    Done,
    Pending,
    InProgress,
    Skipped,
    Failed,
}

pub struct StepContext {
    step_num: usize,
    steps: Vec<Step>,
}

pub struct Step {
    desc: &'static str,
    key: TaskKey,
    progress_bar: ProgressBar,
}

const STEPS: [(&str, TaskKey); 4] = [
    ("Generate plan", TaskKey::GeneratePlan),
    ("Read design", TaskKey::ReadDesign),
    ("Clone gates", TaskKey::CloneGates),
    ("Write design", TaskKey::WriteDesign),
];

impl StepContext {
    pub fn new() -> Self {
        println!("Tasks:");

        let mp = MultiProgress::new();
        let width = format!("{}", STEPS.len()).len();
        let mut steps = Vec::with_capacity(STEPS.len());
        for (i, (desc, key)) in STEPS.into_iter().enumerate() {
            let mut step = Step {
                desc,
                key,
                progress_bar: mp.add(ProgressBar::new_spinner()),
            };
            let msg = format!("[{:width$}/{:width$}] {}", i + 1, STEPS.len(), step.desc);
            step.set_status(StepStatus::Pending, Some(msg));
            steps.push(step);
        }
        steps[0]
            .progress_bar
            .enable_steady_tick(Duration::from_millis(200));
        StepContext { step_num: 0, steps }
    }

    pub fn advance(&mut self) {
        self.step_num += 1;
    }

    #[inline]
    pub fn current_step(&mut self) -> Option<&mut Step> {
        self.steps.get_mut(self.step_num)
    }

    /// Marks the current step failed and the rest skipped if `res` is an error.
    pub fn check<T>(&mut self, res: Result<T>) -> Result<T> {
        if res.is_err() {
            if let Some(current_step) = self.current_step() {
                current_step.set_status(StepStatus::Failed, None);
                self.advance();
                while let Some(current_step) = self.current_step() {
                    current_step.set_status(StepStatus::Skipped, None);
                    self.advance();
                }
            }
            println!("\n");
        }

        res
    }

    pub fn finish(&mut self, key: TaskKey) {
        let Some(current_step) = self.current_step() else {
            panic!("A step was completed after all steps were marked completed");
        };
        if current_step.key != key {
            panic!("A step was completed out of order");
        }

        current_step.set_status(StepStatus::Done, None);

        self.advance();

        if let Some(current_step) = self.current_step() {
            current_step.set_status(StepStatus::InProgress, None);
        } else {
            self.done();
        }
    }

    pub fn done(&mut self) {
        println!("\n\nCompleted all tasks");
    }
}

impl Default for StepContext {
    fn default() -> Self {
        Self::new()
    }
}

fn format_template(spinner: bool, status: impl Display) -> String {
    if spinner {
        format!("{{spinner:.green}} {:16} {{msg}}", status)
    } else {
        format!("  {:16} {{msg}}", status)
    }
}

impl Step {
    fn set_status(&mut self, status: StepStatus, msg: Option<String>) {
        let status_template = match status {
            StepStatus::Done => format_template(false, "Done".green().bold()),
            StepStatus::Failed => format_template(false, "Failed".bright_white().on_red().bold()),
            StepStatus::InProgress => format_template(true, "In Progress".bright_white().bold()),
            StepStatus::Pending => format_template(true, "Pending".blue().bold()),
            StepStatus::Skipped => format_template(false, "Skipped".yellow().bold()),
        };
        if let Ok(style) = ProgressStyle::with_template(&status_template) {
            self.progress_bar.set_style(style);
        }

        if let Some(msg) = msg {
            self.progress_bar.set_message(msg);
        }

        if status == StepStatus::InProgress {
            self.progress_bar
                .enable_steady_tick(Duration::from_millis(200));
        } else if status != StepStatus::Pending {
            self.progress_bar.finish();
        }
    }
}
