use crate::model::{Outcome, SkipReason};
use std::path::Path;

/// Trait for observing a run.
///
/// CLI implements with colored terminal output; tests use [`SilentReporter`].
/// All methods have default no-op implementations.
pub trait RunReporter {
    fn on_run_start(&self, _targets: usize) {}
    fn on_target_start(&self, _root: &Path) {}
    fn on_target_warning(&self, _root: &Path, _reason: &SkipReason) {}
    fn on_outcome(&self, _outcome: &Outcome) {}
    fn on_target_complete(&self, _root: &Path, _outcomes: &[Outcome], _duration_secs: f64) {}
    fn on_run_complete(&self, _outcomes: &[Outcome], _duration_secs: f64) {}
}

/// No-op reporter for silent operation.
pub struct SilentReporter;

impl RunReporter for SilentReporter {}
