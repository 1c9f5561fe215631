use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Conditions that abort a run before any directory is scanned.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Cannot read watch list {}: {source}", .path.display())]
    WatchList {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Watch list {} names no directories", .0.display())]
    NoWatchTargets(PathBuf),

    #[error("Administrative credential incomplete: {0}")]
    MissingCredential(String),

    #[error("Required setting {0} is not set")]
    MissingSetting(&'static str),

    #[error("Invalid window length {0} hours: must be a finite, non-negative number")]
    WindowHours(f64),

    #[error("Invalid companion glob '{glob}': {source}")]
    CompanionGlob {
        glob: String,
        source: glob::PatternError,
    },
}

/// Why a watch target could not be scanned. The run moves on to the next target.
#[derive(Error, Debug)]
pub enum LocateError {
    #[error("suffix allow-list is empty")]
    NoSuffixes,

    #[error("cannot read {}: {source}", .root.display())]
    RootUnreadable {
        root: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("no descriptor found for {}", .0.display())]
    Missing(PathBuf),

    #[error("descriptor {} unreadable: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("descriptor {} is not valid JSON: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("descriptor {} has invalid content: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },
}

impl ResolveError {
    /// True for the "present but invalid content" family.
    pub fn is_content_error(&self) -> bool {
        matches!(self, ResolveError::Malformed { .. } | ResolveError::Invalid { .. })
    }
}

/// One external operation did not succeed.
#[derive(Error, Debug)]
pub enum OperationError {
    #[error("{operation}: failed to start: {source}")]
    Spawn {
        operation: &'static str,
        source: std::io::Error,
    },

    #[error("{operation}: no result after {}s, process killed", .after.as_secs())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("{operation}: exited with {}: {detail}", exit_code(.code))]
    Exit {
        operation: &'static str,
        code: Option<i32>,
        detail: String,
    },

    #[error("{operation}: unexpected output {output:?}")]
    UnexpectedOutput {
        operation: &'static str,
        output: String,
    },
}

fn exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}
