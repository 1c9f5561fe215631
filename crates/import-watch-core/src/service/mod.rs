mod cli;
mod process;

pub use cli::CliService;
pub use process::{run_command, CommandOutput};

use crate::error::OperationError;
use crate::model::Impersonation;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// A `Kind:id` reference to an object held by the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub kind: String,
    pub id: u64,
}

impl ObjectRef {
    pub fn new(kind: &str, id: u64) -> Self {
        Self {
            kind: kind.to_string(),
            id,
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for ObjectRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("not a Kind:id reference: {:?}", s))?;
        let valid_kind = !kind.is_empty() && kind.chars().all(|c| c.is_ascii_alphanumeric());
        let id = id.parse::<u64>().ok().filter(|_| valid_kind);
        match id {
            Some(id) => Ok(ObjectRef::new(kind, id)),
            None => Err(format!("not a Kind:id reference: {:?}", s)),
        }
    }
}

/// How imported files reach the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// Symlink in place; the service host mounts the same share.
    Link,
}

impl Transfer {
    pub fn as_arg(&self) -> &'static str {
        match self {
            Transfer::Link => "ln_s",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportRequest<'a> {
    pub path: &'a Path,
    pub container_id: u64,
    pub as_identity: Impersonation<'a>,
    pub transfer: Transfer,
    pub depth: u32,
    pub parallel: u32,
}

/// Connection settings for the external command-line client.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSettings {
    #[serde(default = "default_cli")]
    pub cli: PathBuf,
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_depth")]
    pub depth: u32,
    #[serde(default = "default_parallel")]
    pub parallel: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_cli() -> PathBuf {
    PathBuf::from("omero")
}

fn default_port() -> u16 {
    4064
}

fn default_depth() -> u32 {
    4
}

fn default_parallel() -> u32 {
    4
}

fn default_timeout_secs() -> u64 {
    3600
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::new("")
    }
}

impl ServiceSettings {
    pub fn new(host: &str) -> Self {
        Self {
            cli: default_cli(),
            host: host.to_string(),
            port: default_port(),
            depth: default_depth(),
            parallel: default_parallel(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn has_host(&self) -> bool {
        !self.host.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// The asset-management service. Every call blocks until the service
/// answers or the operation fails.
pub trait ImportService {
    fn import(&self, request: &ImportRequest<'_>) -> Result<(), OperationError>;

    /// Open a session acting as `as_identity`.
    fn login(&self, as_identity: &Impersonation<'_>)
        -> Result<Box<dyn AnnotationSession>, OperationError>;
}

/// An impersonated session, reused for every upload of one identity.
pub trait AnnotationSession {
    fn upload(&mut self, path: &Path) -> Result<ObjectRef, OperationError>;

    fn create_annotation(&mut self, file: &ObjectRef) -> Result<ObjectRef, OperationError>;

    fn link(&mut self, container_id: u64, annotation: &ObjectRef) -> Result<(), OperationError>;

    fn close(self: Box<Self>) -> Result<(), OperationError>;
}
