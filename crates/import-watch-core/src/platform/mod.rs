#[cfg(unix)]
pub mod unix;

use std::fs::Metadata;
use std::io;
use std::time::SystemTime;

/// Where a creation timestamp came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    Birth,
    StatusChange,
}

/// Creation (birth) time of a file. On Unix file systems that do not record
/// birth time, falls back to the inode status-change time.
pub fn creation_time(metadata: &Metadata) -> io::Result<(SystemTime, TimeSource)> {
    match metadata.created() {
        Ok(created) => Ok((created, TimeSource::Birth)),
        Err(err) => fallback_creation_time(metadata, err),
    }
}

#[cfg(unix)]
fn fallback_creation_time(
    metadata: &Metadata,
    _err: io::Error,
) -> io::Result<(SystemTime, TimeSource)> {
    unix::status_change_time(metadata).map(|t| (t, TimeSource::StatusChange))
}

#[cfg(not(unix))]
fn fallback_creation_time(
    _metadata: &Metadata,
    err: io::Error,
) -> io::Result<(SystemTime, TimeSource)> {
    Err(err)
}
