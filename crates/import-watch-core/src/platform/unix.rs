use std::fs::Metadata;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub fn status_change_time(metadata: &Metadata) -> io::Result<SystemTime> {
    let secs = metadata.ctime();
    let nanos = metadata.ctime_nsec();
    if secs < 0 || nanos < 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("status change time before epoch: {}", secs),
        ));
    }
    Ok(UNIX_EPOCH + Duration::new(secs as u64, nanos as u32))
}
