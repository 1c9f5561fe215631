use super::process::{last_line, run_command};
use super::{AnnotationSession, ImportRequest, ImportService, ObjectRef, ServiceSettings};
use crate::error::OperationError;
use crate::model::Impersonation;
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, warn};

const SESSION_DIR_ENV: &str = "OMERO_SESSIONDIR";
const CONTAINER_KIND: &str = "Dataset";
const ANNOTATION_KIND: &str = "FileAnnotation";
const LINK_KIND: &str = "DatasetAnnotationLink";

/// Drives the service through its command-line client, one child process
/// per operation.
#[derive(Debug, Clone)]
pub struct CliService {
    settings: ServiceSettings,
}

impl CliService {
    pub fn new(settings: ServiceSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    fn connection_args(&self, as_identity: &Impersonation<'_>) -> Vec<OsString> {
        vec![
            "-s".into(),
            self.settings.host.clone().into(),
            "-p".into(),
            self.settings.port.to_string().into(),
            "-u".into(),
            as_identity.admin.user.clone().into(),
            "-w".into(),
            as_identity.admin.secret.clone().into(),
            "--sudo".into(),
            as_identity.sudo_as.into(),
        ]
    }

    pub(crate) fn import_args(&self, request: &ImportRequest<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["import".into()];
        args.extend(self.connection_args(&request.as_identity));
        args.push(format!("--transfer={}", request.transfer.as_arg()).into());
        args.push(format!("--depth={}", request.depth).into());
        args.push(format!("--parallel-fileset={}", request.parallel).into());
        args.push(format!("--parallel-upload={}", request.parallel).into());
        args.push("-d".into());
        args.push(request.container_id.to_string().into());
        args.push("--no-upgrade-check".into());
        args.push(request.path.as_os_str().to_os_string());
        args
    }
}

impl ImportService for CliService {
    fn import(&self, request: &ImportRequest<'_>) -> Result<(), OperationError> {
        debug!(
            "Importing {} into {}:{} as {}",
            request.path.display(),
            CONTAINER_KIND,
            request.container_id,
            request.as_identity.sudo_as
        );
        let mut cmd = Command::new(&self.settings.cli);
        cmd.args(self.import_args(request));
        run_command("import", &mut cmd, self.settings.timeout())?;
        Ok(())
    }

    fn login(
        &self,
        as_identity: &Impersonation<'_>,
    ) -> Result<Box<dyn AnnotationSession>, OperationError> {
        let session_dir = tempfile::Builder::new()
            .prefix("import-watch-session-")
            .tempdir()
            .map_err(|source| OperationError::Spawn {
                operation: "login",
                source,
            })?;

        let mut cmd = Command::new(&self.settings.cli);
        cmd.env(SESSION_DIR_ENV, session_dir.path())
            .arg("login")
            .args(self.connection_args(as_identity));
        run_command("login", &mut cmd, self.settings.timeout())?;

        Ok(Box::new(CliSession {
            settings: self.settings.clone(),
            session_dir,
        }))
    }
}

/// A logged-in client whose state lives in its own session directory.
struct CliSession {
    settings: ServiceSettings,
    session_dir: TempDir,
}

impl CliSession {
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.settings.cli);
        cmd.env(SESSION_DIR_ENV, self.session_dir.path());
        cmd
    }

    fn run_for_ref(
        &self,
        operation: &'static str,
        cmd: &mut Command,
    ) -> Result<ObjectRef, OperationError> {
        let output = run_command(operation, cmd, self.settings.timeout())?;
        last_line(&output.stdout)
            .and_then(|line| line.parse::<ObjectRef>().ok())
            .ok_or_else(|| OperationError::UnexpectedOutput {
                operation,
                output: output.stdout.trim().to_string(),
            })
    }
}

impl AnnotationSession for CliSession {
    fn upload(&mut self, path: &Path) -> Result<ObjectRef, OperationError> {
        let mut cmd = self.command();
        cmd.arg("upload").arg(path);
        self.run_for_ref("upload", &mut cmd)
    }

    fn create_annotation(&mut self, file: &ObjectRef) -> Result<ObjectRef, OperationError> {
        let mut cmd = self.command();
        cmd.args(["obj", "new", ANNOTATION_KIND])
            .arg(format!("file={}", file));
        self.run_for_ref("create-annotation", &mut cmd)
    }

    fn link(&mut self, container_id: u64, annotation: &ObjectRef) -> Result<(), OperationError> {
        let mut cmd = self.command();
        cmd.args(["obj", "new", LINK_KIND])
            .arg(format!("parent={}:{}", CONTAINER_KIND, container_id))
            .arg(format!("child={}", annotation));
        self.run_for_ref("link", &mut cmd).map(|_| ())
    }

    fn close(self: Box<Self>) -> Result<(), OperationError> {
        let this = *self;
        let mut cmd = this.command();
        cmd.arg("logout");
        let result = run_command("logout", &mut cmd, this.settings.timeout()).map(|_| ());
        if let Err(err) = this.session_dir.close() {
            warn!("Could not remove session directory: {}", err);
        }
        result
    }
}
