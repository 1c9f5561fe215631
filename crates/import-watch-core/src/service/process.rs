use crate::error::OperationError;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Run `cmd` to completion, waiting at most `timeout`.
///
/// Output is captured in anonymous temporary files rather than pipes, so a
/// child that writes a lot cannot stall on a full pipe while we poll it.
/// A non-zero exit is returned as [`OperationError::Exit`].
pub fn run_command(
    operation: &'static str,
    cmd: &mut Command,
    timeout: Duration,
) -> Result<CommandOutput, OperationError> {
    let spawn_err = |source: io::Error| OperationError::Spawn { operation, source };

    let mut stdout_file = tempfile::tempfile().map_err(spawn_err)?;
    let mut stderr_file = tempfile::tempfile().map_err(spawn_err)?;

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout_file.try_clone().map_err(spawn_err)?))
        .stderr(Stdio::from(stderr_file.try_clone().map_err(spawn_err)?))
        .spawn()
        .map_err(spawn_err)?;

    let start = Instant::now();
    let status = loop {
        match child.try_wait().map_err(spawn_err)? {
            Some(status) => break status,
            None => {
                if start.elapsed() >= timeout {
                    terminate(&mut child, operation);
                    return Err(OperationError::Timeout {
                        operation,
                        after: timeout,
                    });
                }
                thread::sleep(POLL_INTERVAL);
            }
        }
    };
    debug!(
        "{} finished in {:.2}s with {}",
        operation,
        start.elapsed().as_secs_f64(),
        status
    );

    let stdout = read_back(&mut stdout_file).map_err(spawn_err)?;
    let stderr = read_back(&mut stderr_file).map_err(spawn_err)?;

    if !status.success() {
        return Err(OperationError::Exit {
            operation,
            code: status.code(),
            detail: last_line(&stderr)
                .or_else(|| last_line(&stdout))
                .unwrap_or("no output")
                .to_string(),
        });
    }

    Ok(CommandOutput {
        status,
        stdout,
        stderr,
    })
}

/// Kill and reap a child that ran past its deadline. Failures are logged so a
/// stuck or unreaped process is visible in the run log.
fn terminate(child: &mut Child, operation: &'static str) -> Option<ExitStatus> {
    if let Err(err) = child.kill() {
        warn!("Could not kill {} process {}: {}", operation, child.id(), err);
    }
    match child.wait() {
        Ok(status) => Some(status),
        Err(err) => {
            warn!("Could not reap {} process {}: {}", operation, child.id(), err);
            None
        }
    }
}

fn read_back(file: &mut File) -> io::Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub(crate) fn last_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).last()
}
