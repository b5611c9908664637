use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::types::{ExecutionReport, WorkerResult};

const ERROR_PREVIEW_CHARS: usize = 60;

/// Outcome counts for the batch currently in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchTally {
    pub batch_index: usize,
    pub total_batches: usize,
    pub pending: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchTally {
    pub fn message(&self) -> String {
        let mut msg = format!(
            "batch {}/{}: {} ok",
            self.batch_index + 1,
            self.total_batches,
            self.succeeded
        );
        if self.failed > 0 {
            msg.push_str(&format!(", {} failed", self.failed));
        }
        if self.pending > 0 {
            msg.push_str(&format!(", {} running", self.pending));
        }
        msg
    }
}

/// Terminal progress for a batch run: one bar over all tasks, whose message
/// tracks the current batch, and a spinner per task of that batch.
///
/// Tallies are kept even when drawing is disabled.
pub struct ProgressMonitor {
    multi: MultiProgress,
    overall: ProgressBar,
    spinners: HashMap<String, ProgressBar>,
    tally: BatchTally,
    enabled: bool,
}

impl ProgressMonitor {
    pub fn new(total_tasks: usize, enabled: bool) -> Self {
        let multi = MultiProgress::new();
        let overall = if enabled {
            let bar = multi.add(ProgressBar::new(total_tasks as u64));
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} tasks {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("█▓▒░  "),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        Self {
            multi,
            overall,
            spinners: HashMap::new(),
            tally: BatchTally::default(),
            enabled,
        }
    }

    /// Reset the tally and open a spinner for every task of the batch.
    pub fn start_batch(&mut self, batch_index: usize, total_batches: usize, task_ids: &[String]) {
        self.clear_spinners();
        self.tally = BatchTally {
            batch_index,
            total_batches,
            pending: task_ids.len(),
            ..BatchTally::default()
        };

        if self.enabled {
            for task_id in task_ids {
                let spinner = self.multi.add(ProgressBar::new_spinner());
                spinner.set_style(
                    ProgressStyle::default_spinner()
                        .template("  {spinner:.green} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                spinner.set_message(format!("{} (batch {})", task_id, batch_index + 1));
                spinner.enable_steady_tick(Duration::from_millis(100));
                self.spinners.insert(task_id.clone(), spinner);
            }
        }
        self.overall.set_message(self.tally.message());
    }

    /// Count one finished task; a failure leaves its first error on the spinner.
    pub fn record(&mut self, result: &WorkerResult) {
        self.tally.pending = self.tally.pending.saturating_sub(1);
        if result.success {
            self.tally.succeeded += 1;
        } else {
            self.tally.failed += 1;
        }

        if let Some(spinner) = self.spinners.remove(&result.task_id) {
            spinner.finish_with_message(task_line(result));
        }
        self.overall.inc(1);
        self.overall.set_message(self.tally.message());
    }

    pub fn tally(&self) -> &BatchTally {
        &self.tally
    }

    pub fn finish(&mut self, report: &ExecutionReport) {
        self.clear_spinners();
        let msg = if report.overall_success {
            format!("{} tasks succeeded", report.total_tasks)
        } else {
            format!("{} of {} tasks failed", report.failed, report.total_tasks)
        };
        self.overall.finish_with_message(msg);
    }

    fn clear_spinners(&mut self) {
        for (_, spinner) in self.spinners.drain() {
            spinner.finish_and_clear();
        }
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        self.clear_spinners();
    }
}

fn task_line(result: &WorkerResult) -> String {
    if result.success {
        return format!("ok   {} ({}ms)", result.task_id, result.duration_ms);
    }
    let reason = result.errors.first().unwrap_or(&result.message);
    let mut preview: String = reason.chars().take(ERROR_PREVIEW_CHARS).collect();
    if reason.chars().count() > ERROR_PREVIEW_CHARS {
        preview.push_str("...");
    }
    format!("FAIL {} ({}ms): {}", result.task_id, result.duration_ms, preview)
}
