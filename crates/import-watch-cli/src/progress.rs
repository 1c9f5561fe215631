use colored::*;
use import_watch_core::model::{Outcome, OutcomeStatus, Pass, SkipReason};
use import_watch_core::RunReporter;
use std::path::Path;

/// Terminal summary of a run. The run log carries the detail.
pub struct CliReporter;

impl CliReporter {
    pub fn new() -> Self {
        Self
    }
}

fn tally(outcomes: &[Outcome]) -> (usize, usize, usize, usize) {
    outcomes.iter().fold((0, 0, 0, 0), |(imp, ann, skip, fail), o| match o.status {
        OutcomeStatus::Imported => (imp + 1, ann, skip, fail),
        OutcomeStatus::Annotated => (imp, ann + 1, skip, fail),
        OutcomeStatus::Skipped(_) => (imp, ann, skip + 1, fail),
        OutcomeStatus::Failed(_) => (imp, ann, skip, fail + 1),
    })
}

impl RunReporter for CliReporter {
    fn on_run_start(&self, targets: usize) {
        eprintln!("Watching {} directories", format!("{}", targets).cyan());
    }

    fn on_target_start(&self, root: &Path) {
        eprintln!("{} {}", "→".cyan(), root.display());
    }

    fn on_target_warning(&self, root: &Path, reason: &SkipReason) {
        eprintln!("  {} {}: {}", "!".yellow(), root.display(), reason);
    }

    fn on_outcome(&self, outcome: &Outcome) {
        let verb = match outcome.pass {
            Pass::Annotate => "annotate",
            _ => "import",
        };
        if let OutcomeStatus::Failed(detail) = &outcome.status {
            eprintln!(
                "  {} {} {}: {}",
                "✗".red(),
                verb,
                outcome.path.display(),
                detail
            );
        }
    }

    fn on_target_complete(&self, _root: &Path, outcomes: &[Outcome], duration_secs: f64) {
        let (imported, annotated, skipped, failed) = tally(outcomes);
        eprintln!(
            "  {} {} imported, {} annotated, {} skipped, {} failed in {:.2}s",
            "✓".green(),
            format!("{}", imported).green(),
            format!("{}", annotated).green(),
            format!("{}", skipped).yellow(),
            format!("{}", failed).red(),
            duration_secs
        );
    }

    fn on_run_complete(&self, outcomes: &[Outcome], duration_secs: f64) {
        let (imported, annotated, skipped, failed) = tally(outcomes);
        eprintln!(
            "Run complete in {}: {} imported, {} annotated, {} skipped, {} failed",
            format!("{:.2}s", duration_secs).green(),
            imported,
            annotated,
            skipped,
            failed
        );
    }
}
