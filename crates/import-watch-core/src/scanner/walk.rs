use super::window::{FreshnessPolicy, TimeWindow};
use crate::error::LocateError;
use crate::model::CandidateFile;
use crate::platform::{self, TimeSource};
use glob::{MatchOptions, Pattern};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

const CASE_INSENSITIVE: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Which file names a walk picks up.
#[derive(Debug, Clone)]
pub enum FileMatcher {
    /// Case-insensitive `ends_with` over the file name. Suffixes are stored lower-cased.
    Suffixes(Vec<String>),
    /// Case-insensitive glob over the file name.
    Glob(Pattern),
}

impl FileMatcher {
    pub fn suffixes<S: AsRef<str>>(suffixes: &[S]) -> Self {
        FileMatcher::Suffixes(
            suffixes
                .iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }

    /// Matches exactly one file name.
    pub fn exact(file_name: &str) -> Self {
        // Escaped patterns always compile.
        FileMatcher::Glob(Pattern::new(&Pattern::escape(file_name)).unwrap_or_default())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FileMatcher::Suffixes(s) if s.is_empty())
    }

    pub fn matches(&self, file_name: &str) -> bool {
        match self {
            FileMatcher::Suffixes(suffixes) => {
                let lowered = file_name.to_lowercase();
                suffixes.iter().any(|suffix| lowered.ends_with(suffix.as_str()))
            }
            FileMatcher::Glob(pattern) => pattern.matches_with(file_name, CASE_INSENSITIVE),
        }
    }
}

/// Files found by one walk, plus the paths that had to be dropped.
#[derive(Debug, Default)]
pub struct Located {
    pub files: Vec<CandidateFile>,
    pub skipped: Vec<(PathBuf, String)>,
}

/// Matching regular files under `root` created inside `window`.
pub fn locate<S: AsRef<str>>(
    root: &Path,
    suffixes: &[S],
    window: &TimeWindow,
) -> Result<Located, LocateError> {
    locate_with(root, &FileMatcher::suffixes(suffixes), window)
}

/// Recursive walk of `root` in path order. A path whose metadata cannot be
/// read is recorded in [`Located::skipped`] and the walk continues.
pub fn locate_with(
    root: &Path,
    matcher: &FileMatcher,
    policy: &dyn FreshnessPolicy,
) -> Result<Located, LocateError> {
    if matcher.is_empty() {
        return Err(LocateError::NoSuffixes);
    }
    if let Err(source) = fs::read_dir(root) {
        return Err(LocateError::RootUnreadable {
            root: root.to_path_buf(),
            source,
        });
    }

    let mut located = Located::default();
    let walker = WalkDir::new(root).follow_links(false).sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                warn!("Skipping {}: {}", path.display(), err);
                located.skipped.push((path, err.to_string()));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if !matcher.matches(&entry.file_name().to_string_lossy()) {
            continue;
        }
        match candidate_from(entry.path(), entry.metadata().map_err(|e| e.to_string())) {
            Ok(candidate) => {
                if policy.is_fresh(&candidate) {
                    located.files.push(candidate);
                } else {
                    debug!("{} is outside the window", candidate.path.display());
                }
            }
            Err(reason) => {
                warn!("Skipping {}: {}", entry.path().display(), reason);
                located.skipped.push((entry.path().to_path_buf(), reason));
            }
        }
    }

    Ok(located)
}

/// Fresh files directly inside `dir` (not below it) matching `pattern`,
/// excluding `exclude`, sorted by path.
pub fn companions_of(
    dir: &Path,
    pattern: &Pattern,
    exclude: &Path,
    policy: &dyn FreshnessPolicy,
) -> Located {
    let mut located = Located::default();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(dir).to_path_buf();
                located.skipped.push((path, err.to_string()));
                continue;
            }
        };
        if !entry.file_type().is_file() || entry.path() == exclude {
            continue;
        }
        if !pattern.matches_with(&entry.file_name().to_string_lossy(), CASE_INSENSITIVE) {
            continue;
        }
        match candidate_from(entry.path(), entry.metadata().map_err(|e| e.to_string())) {
            Ok(candidate) if policy.is_fresh(&candidate) => located.files.push(candidate),
            Ok(_) => {}
            Err(reason) => located.skipped.push((entry.path().to_path_buf(), reason)),
        }
    }
    located
}

fn candidate_from(
    path: &Path,
    metadata: Result<fs::Metadata, String>,
) -> Result<CandidateFile, String> {
    let metadata = metadata?;
    let (created, source) = platform::creation_time(&metadata).map_err(|e| e.to_string())?;
    if source == TimeSource::StatusChange {
        debug!(
            "No birth time for {}, using status change time",
            path.display()
        );
    }
    Ok(CandidateFile {
        path: path.to_path_buf(),
        created,
    })
}
