use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// One configured root directory and the suffixes imported from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub root: PathBuf,
    pub suffixes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub created: SystemTime,
}

/// Routing metadata read from a sidecar descriptor. Only constructed
/// through [`ImportIdentity::new`], so both fields are always valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportIdentity {
    container_id: u64,
    identity_name: String,
}

impl ImportIdentity {
    pub fn new(container_id: u64, identity_name: &str) -> Option<Self> {
        let trimmed = identity_name.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            container_id,
            identity_name: trimmed.to_string(),
        })
    }

    pub fn container_id(&self) -> u64 {
        self.container_id
    }

    pub fn identity_name(&self) -> &str {
        &self.identity_name
    }
}

impl fmt::Display for ImportIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.identity_name, self.container_id)
    }
}

#[derive(Debug, Clone)]
pub struct WorkItem {
    pub file: CandidateFile,
    pub identity: ImportIdentity,
}

/// A descriptor and the companion files that arrived in the same window,
/// kept in upload order: descriptor first, then companions by path.
#[derive(Debug, Clone)]
pub struct CompanionSet {
    pub descriptor: PathBuf,
    pub companions: Vec<PathBuf>,
}

impl CompanionSet {
    pub fn upload_order(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.descriptor.as_path()).chain(self.companions.iter().map(PathBuf::as_path))
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct AdminCredential {
    pub user: String,
    pub secret: String,
}

impl fmt::Debug for AdminCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredential")
            .field("user", &self.user)
            .field("secret", &"********")
            .finish()
    }
}

/// Administrative credential paired with the identity it acts as.
#[derive(Debug, Clone)]
pub struct Impersonation<'a> {
    pub admin: &'a AdminCredential,
    pub sudo_as: &'a str,
}

/// Which part of the run an outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Target,
    Import,
    Annotate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    TargetMissing,
    NoSuffixes,
    RootUnreadable(String),
    Metadata(String),
    DescriptorMissing(String),
    DescriptorInvalid(String),
    AlreadyQueued,
    AwaitingCompanion,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TargetMissing => write!(f, "watch directory does not exist"),
            SkipReason::NoSuffixes => write!(f, "no suffix allow-list"),
            SkipReason::RootUnreadable(detail) => write!(f, "watch directory unreadable: {}", detail),
            SkipReason::Metadata(detail) => write!(f, "metadata unreadable: {}", detail),
            SkipReason::DescriptorMissing(detail) => write!(f, "{}", detail),
            SkipReason::DescriptorInvalid(detail) => write!(f, "{}", detail),
            SkipReason::AlreadyQueued => write!(f, "already handled by an earlier watch target"),
            SkipReason::AwaitingCompanion => write!(f, "no companion file yet, deferred"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Imported,
    Annotated,
    Skipped(SkipReason),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct Outcome {
    pub pass: Pass,
    pub path: PathBuf,
    pub identity: Option<ImportIdentity>,
    pub status: OutcomeStatus,
}

impl Outcome {
    pub fn skipped(pass: Pass, path: impl Into<PathBuf>, reason: SkipReason) -> Self {
        Self {
            pass,
            path: path.into(),
            identity: None,
            status: OutcomeStatus::Skipped(reason),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Imported | OutcomeStatus::Annotated)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed(_))
    }

    pub fn is_skip(&self) -> bool {
        matches!(self.status, OutcomeStatus::Skipped(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_name_is_trimmed_and_required() {
        let identity = ImportIdentity::new(7, "  alice \n").unwrap();
        assert_eq!(identity.identity_name(), "alice");
        assert_eq!(identity.container_id(), 7);
        assert!(ImportIdentity::new(7, "   ").is_none());
        assert!(ImportIdentity::new(7, "").is_none());
    }

    #[test]
    fn upload_order_puts_descriptor_first() {
        let set = CompanionSet {
            descriptor: PathBuf::from("/d/descriptor.json"),
            companions: vec![PathBuf::from("/d/README.md"), PathBuf::from("/d/README.txt")],
        };
        let order: Vec<&Path> = set.upload_order().collect();
        assert_eq!(
            order,
            vec![
                Path::new("/d/descriptor.json"),
                Path::new("/d/README.md"),
                Path::new("/d/README.txt")
            ]
        );
    }

    #[test]
    fn admin_secret_is_redacted_in_debug() {
        let admin = AdminCredential {
            user: "root".to_string(),
            secret: "hunter2".to_string(),
        };
        let rendered = format!("{:?}", admin);
        assert!(rendered.contains("root"));
        assert!(!rendered.contains("hunter2"));
    }
}
