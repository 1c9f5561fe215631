use crate::model::{AdminCredential, Impersonation, Outcome, OutcomeStatus, Pass, WorkItem};
use crate::service::{ImportRequest, ImportService, Transfer};
use tracing::{error, info};

/// Parameters every import of a run shares.
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    pub depth: u32,
    pub parallel: u32,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            depth: 4,
            parallel: 4,
        }
    }
}

/// Import one file as the identity its descriptor names. Blocks until the
/// service answers; a failure is reported, never retried.
pub fn import(
    service: &dyn ImportService,
    item: &WorkItem,
    admin: &AdminCredential,
    options: ImportOptions,
) -> Outcome {
    let request = ImportRequest {
        path: &item.file.path,
        container_id: item.identity.container_id(),
        as_identity: Impersonation {
            admin,
            sudo_as: item.identity.identity_name(),
        },
        transfer: Transfer::Link,
        depth: options.depth,
        parallel: options.parallel,
    };

    let status = match service.import(&request) {
        Ok(()) => {
            info!(
                "Imported {} into container {} as {}",
                item.file.path.display(),
                item.identity.container_id(),
                item.identity.identity_name()
            );
            OutcomeStatus::Imported
        }
        Err(err) => {
            error!(
                "Import of {} as {} failed: {}",
                item.file.path.display(),
                item.identity.identity_name(),
                err
            );
            OutcomeStatus::Failed(err.to_string())
        }
    };

    Outcome {
        pass: Pass::Import,
        path: item.file.path.clone(),
        identity: Some(item.identity.clone()),
        status,
    }
}
