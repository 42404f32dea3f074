//! Progress reporting utilities

use indicatif::{ProgressBar, ProgressStyle};
use rowdelta_core::reconcile::{ReconcilePhase, ReconcileProgress};
use std::time::Duration;

/// Spinner following the phases of a reconciliation run
#[derive(Debug)]
pub struct ProgressReporter {
    spinner: Option<ProgressBar>,
}

impl ProgressReporter {
    pub fn new(enabled: bool) -> Self {
        Self {
            spinner: enabled.then(|| create_spinner("Loading datasets...")),
        }
    }

    pub fn set_message(&self, message: &str) {
        if let Some(pb) = &self.spinner {
            pb.set_message(message.to_string());
        }
    }

    /// Callback target for `Reconciler::reconcile_with_progress`
    pub fn update(&self, progress: ReconcileProgress) {
        if let Some(pb) = &self.spinner {
            let message = match progress.phase {
                ReconcilePhase::Complete => progress.message,
                _ => format!(
                    "{} ({} rows)",
                    progress.message.trim_end_matches("..."),
                    progress.total_rows
                ),
            };
            pb.set_message(message);
        }
    }

    pub fn finish(&mut self, message: &str) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_with_message(message.to_string());
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}

/// Create a spinner progress bar
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_reporter_ignores_updates() {
        let mut reporter = ProgressReporter::new(false);
        reporter.update(ReconcileProgress {
            phase: ReconcilePhase::Hashing,
            processed_rows: 0,
            total_rows: 10,
            message: "Hashing rows...".to_string(),
        });
        reporter.finish("done");
        assert!(reporter.spinner.is_none());
    }
}
