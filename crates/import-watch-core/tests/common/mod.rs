#![allow(dead_code)]

use import_watch_core::error::OperationError;
use import_watch_core::model::{AdminCredential, Impersonation, WatchTarget};
use import_watch_core::service::{AnnotationSession, ImportRequest, ImportService, ObjectRef};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, SystemTime};

use import_watch_core::scanner::TimeWindow;

pub const DAY: Duration = Duration::from_secs(24 * 3600);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Import {
        path: PathBuf,
        container_id: u64,
        identity: String,
        admin: String,
    },
    Login(String),
    Upload(String, PathBuf),
    CreateAnnotation(String, ObjectRef),
    Link(String, u64, ObjectRef),
    Close(String),
}

/// Records every call; fails the operations it is told to fail.
#[derive(Default)]
pub struct RecordingService {
    pub calls: Rc<RefCell<Vec<Call>>>,
    next_id: Rc<Cell<u64>>,
    pub fail_import: HashSet<String>,
    pub fail_login: HashSet<String>,
    pub fail_link: Rc<HashSet<String>>,
}

impl RecordingService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_import(mut self, file_name: &str) -> Self {
        self.fail_import.insert(file_name.to_string());
        self
    }

    pub fn failing_login(mut self, identity: &str) -> Self {
        self.fail_login.insert(identity.to_string());
        self
    }

    pub fn failing_link(mut self, file_name: &str) -> Self {
        let mut names: HashSet<String> = (*self.fail_link).clone();
        names.insert(file_name.to_string());
        self.fail_link = Rc::new(names);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn imports(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Import { .. }))
            .collect()
    }

    pub fn logins(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Login(identity) => Some(identity),
                _ => None,
            })
            .collect()
    }

    pub fn uploads(&self) -> Vec<PathBuf> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Upload(_, path) => Some(path),
                _ => None,
            })
            .collect()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl ImportService for RecordingService {
    fn import(&self, request: &ImportRequest<'_>) -> Result<(), OperationError> {
        self.calls.borrow_mut().push(Call::Import {
            path: request.path.to_path_buf(),
            container_id: request.container_id,
            identity: request.as_identity.sudo_as.to_string(),
            admin: request.as_identity.admin.user.clone(),
        });
        if self.fail_import.contains(&file_name(request.path)) {
            return Err(OperationError::Exit {
                operation: "import",
                code: Some(2),
                detail: "corrupt file".to_string(),
            });
        }
        Ok(())
    }

    fn login(
        &self,
        as_identity: &Impersonation<'_>,
    ) -> Result<Box<dyn AnnotationSession>, OperationError> {
        self.calls
            .borrow_mut()
            .push(Call::Login(as_identity.sudo_as.to_string()));
        if self.fail_login.contains(as_identity.sudo_as) {
            return Err(OperationError::Exit {
                operation: "login",
                code: Some(1),
                detail: "no such user".to_string(),
            });
        }
        Ok(Box::new(RecordingSession {
            identity: as_identity.sudo_as.to_string(),
            calls: Rc::clone(&self.calls),
            next_id: Rc::clone(&self.next_id),
            fail_link: Rc::clone(&self.fail_link),
            last_upload: None,
        }))
    }
}

struct RecordingSession {
    identity: String,
    calls: Rc<RefCell<Vec<Call>>>,
    next_id: Rc<Cell<u64>>,
    fail_link: Rc<HashSet<String>>,
    last_upload: Option<String>,
}

impl RecordingSession {
    fn next(&self, kind: &str) -> ObjectRef {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        ObjectRef::new(kind, id)
    }
}

impl AnnotationSession for RecordingSession {
    fn upload(&mut self, path: &Path) -> Result<ObjectRef, OperationError> {
        self.calls
            .borrow_mut()
            .push(Call::Upload(self.identity.clone(), path.to_path_buf()));
        self.last_upload = Some(file_name(path));
        Ok(self.next("OriginalFile"))
    }

    fn create_annotation(&mut self, file: &ObjectRef) -> Result<ObjectRef, OperationError> {
        self.calls
            .borrow_mut()
            .push(Call::CreateAnnotation(self.identity.clone(), file.clone()));
        Ok(self.next("FileAnnotation"))
    }

    fn link(&mut self, container_id: u64, annotation: &ObjectRef) -> Result<(), OperationError> {
        self.calls.borrow_mut().push(Call::Link(
            self.identity.clone(),
            container_id,
            annotation.clone(),
        ));
        match &self.last_upload {
            Some(name) if self.fail_link.contains(name) => Err(OperationError::Exit {
                operation: "link",
                code: Some(1),
                detail: "permission denied".to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn close(self: Box<Self>) -> Result<(), OperationError> {
        self.calls.borrow_mut().push(Call::Close(self.identity.clone()));
        Ok(())
    }
}

pub fn admin() -> AdminCredential {
    AdminCredential {
        user: "root".to_string(),
        secret: "omero-root-password".to_string(),
    }
}

/// A window that covers everything created today.
pub fn window_now() -> TimeWindow {
    TimeWindow::trailing(SystemTime::now() + Duration::from_secs(60), DAY)
}

pub fn target(root: &Path, suffixes: &[&str]) -> WatchTarget {
    WatchTarget {
        root: root.to_path_buf(),
        suffixes: suffixes.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn write_descriptor(dir: &Path, container_id: &str, identity: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join("descriptor.json");
    fs::write(
        &path,
        format!(
            r#"{{"container_id": {}, "identity_name": "{}"}}"#,
            container_id, identity
        ),
    )
    .unwrap();
    path
}

pub fn write_file(dir: &Path, name: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, b"payload").unwrap();
    path
}
