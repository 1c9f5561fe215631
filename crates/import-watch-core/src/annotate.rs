use crate::error::OperationError;
use crate::model::{
    AdminCredential, CompanionSet, Impersonation, ImportIdentity, Outcome, OutcomeStatus, Pass,
    SkipReason,
};
use crate::service::{AnnotationSession, ImportService};
use std::collections::HashMap;
use std::path::Path;
use tracing::{error, info, warn};

/// One annotation pass over a watch target.
///
/// Holds at most one impersonated session per identity for the life of the
/// pass. A failed login is remembered so the identity is not retried until
/// the next pass.
pub struct AnnotationPass<'a> {
    service: &'a dyn ImportService,
    admin: &'a AdminCredential,
    sessions: HashMap<String, Result<Box<dyn AnnotationSession>, String>>,
}

impl<'a> AnnotationPass<'a> {
    pub fn new(service: &'a dyn ImportService, admin: &'a AdminCredential) -> Self {
        Self {
            service,
            admin,
            sessions: HashMap::new(),
        }
    }

    /// Upload and link the descriptor, then each companion, to the identity's
    /// container. A descriptor with no companion yet is deferred untouched.
    pub fn annotate(&mut self, set: &CompanionSet, identity: &ImportIdentity) -> Vec<Outcome> {
        if set.companions.is_empty() {
            info!(
                "Deferring {}: no companion file in this window",
                set.descriptor.display()
            );
            return vec![Outcome {
                identity: Some(identity.clone()),
                ..Outcome::skipped(Pass::Annotate, &set.descriptor, SkipReason::AwaitingCompanion)
            }];
        }

        let service = self.service;
        let admin = self.admin;
        let session = self
            .sessions
            .entry(identity.identity_name().to_string())
            .or_insert_with(|| {
                let as_identity = Impersonation {
                    admin,
                    sudo_as: identity.identity_name(),
                };
                service.login(&as_identity).map_err(|err| {
                    error!("Login as {} failed: {}", identity.identity_name(), err);
                    err.to_string()
                })
            });

        set.upload_order()
            .map(|path| {
                let status = match session.as_mut() {
                    Ok(session) => match attach(&mut **session, path, identity.container_id()) {
                        Ok(()) => {
                            info!(
                                "Annotated container {} with {} as {}",
                                identity.container_id(),
                                path.display(),
                                identity.identity_name()
                            );
                            OutcomeStatus::Annotated
                        }
                        Err(err) => {
                            error!(
                                "Annotation of {} as {} failed: {}",
                                path.display(),
                                identity.identity_name(),
                                err
                            );
                            OutcomeStatus::Failed(err.to_string())
                        }
                    },
                    Err(detail) => OutcomeStatus::Failed(format!("login: {}", detail)),
                };
                Outcome {
                    pass: Pass::Annotate,
                    path: path.to_path_buf(),
                    identity: Some(identity.clone()),
                    status,
                }
            })
            .collect()
    }

    /// Number of identities a login was attempted for.
    pub fn sessions_opened(&self) -> usize {
        self.sessions.len()
    }

    /// Log out of every open session.
    pub fn finish(self) {
        for (identity, session) in self.sessions {
            if let Ok(session) = session {
                if let Err(err) = session.close() {
                    warn!("Closing session for {} failed: {}", identity, err);
                }
            }
        }
    }
}

fn attach(
    session: &mut dyn AnnotationSession,
    path: &Path,
    container_id: u64,
) -> Result<(), OperationError> {
    let file = session.upload(path)?;
    let annotation = session.create_annotation(&file)?;
    session.link(container_id, &annotation)
}
