use crate::annotate::AnnotationPass;
use crate::error::{Error, LocateError, ResolveError};
use crate::import::{self, ImportOptions};
use crate::model::{
    AdminCredential, CompanionSet, ImportIdentity, Outcome, OutcomeStatus, Pass, SkipReason,
    WatchTarget, WorkItem,
};
use crate::progress::RunReporter;
use crate::resolver::DescriptorLayout;
use crate::scanner::{self, FileMatcher, FreshnessPolicy};
use crate::service::ImportService;
use glob::Pattern;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Discovers new files under each watch target, imports them as their
/// owners, then annotates containers with descriptors and companions.
pub struct ImportEngine<'a> {
    service: &'a dyn ImportService,
    descriptor: DescriptorLayout,
    companion_glob: Pattern,
    options: ImportOptions,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<Outcome>,
    pub duration: Duration,
}

impl RunReport {
    pub fn pass(&self, pass: Pass) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(move |o| o.pass == pass)
    }

    pub fn count(&self, pass: Pass, status: fn(&Outcome) -> bool) -> usize {
        self.pass(pass).filter(|o| status(o)).count()
    }
}

/// What a run would do for one target, without contacting the service.
#[derive(Debug, Default)]
pub struct TargetPlan {
    pub work: Vec<WorkItem>,
    pub companion_sets: Vec<(CompanionSet, ImportIdentity)>,
    pub skipped: Vec<Outcome>,
}

impl<'a> ImportEngine<'a> {
    pub fn new(
        service: &'a dyn ImportService,
        descriptor: DescriptorLayout,
        companion_glob: &str,
    ) -> Result<Self, Error> {
        let companion_glob = Pattern::new(companion_glob).map_err(|source| Error::CompanionGlob {
            glob: companion_glob.to_string(),
            source,
        })?;
        Ok(Self {
            service,
            descriptor,
            companion_glob,
            options: ImportOptions::default(),
        })
    }

    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    /// Process every target in order. Nothing that goes wrong for one file or
    /// one target stops the others; each problem becomes an [`Outcome`].
    pub fn run(
        &self,
        targets: &[WatchTarget],
        admin: &AdminCredential,
        policy: &dyn FreshnessPolicy,
        reporter: &dyn RunReporter,
    ) -> RunReport {
        let run_start = Instant::now();
        reporter.on_run_start(targets.len());
        info!("Starting run over {} watch targets, {}", targets.len(), policy.describe());

        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut seen_descriptors: HashSet<PathBuf> = HashSet::new();
        let mut outcomes: Vec<Outcome> = Vec::new();

        for target in targets {
            let target_start = Instant::now();
            reporter.on_target_start(&target.root);
            info!("Scanning {}", target.root.display());

            let mut target_outcomes = Vec::new();
            match self.import_pass(target, admin, policy, &mut seen, reporter) {
                Ok(imports) => {
                    target_outcomes.extend(imports);
                    target_outcomes.extend(self.annotation_pass(
                        target,
                        admin,
                        policy,
                        &mut seen_descriptors,
                        reporter,
                    ));
                }
                Err(reason) => {
                    warn!("Skipping watch target {}: {}", target.root.display(), reason);
                    reporter.on_target_warning(&target.root, &reason);
                    target_outcomes.push(Outcome::skipped(Pass::Target, &target.root, reason));
                }
            }

            let duration = target_start.elapsed();
            info!(
                "Finished {} in {:.2}s: {} imported, {} annotated, {} skipped, {} failed",
                target.root.display(),
                duration.as_secs_f64(),
                target_outcomes.iter().filter(|o| o.status == OutcomeStatus::Imported).count(),
                target_outcomes.iter().filter(|o| o.status == OutcomeStatus::Annotated).count(),
                target_outcomes.iter().filter(|o| o.is_skip()).count(),
                target_outcomes.iter().filter(|o| o.is_failure()).count(),
            );
            reporter.on_target_complete(&target.root, &target_outcomes, duration.as_secs_f64());
            outcomes.extend(target_outcomes);
        }

        let duration = run_start.elapsed();
        reporter.on_run_complete(&outcomes, duration.as_secs_f64());
        RunReport { outcomes, duration }
    }

    /// Locate and resolve everything for `target` without importing.
    pub fn plan(&self, target: &WatchTarget, policy: &dyn FreshnessPolicy) -> Result<TargetPlan, SkipReason> {
        let mut plan = TargetPlan::default();
        let mut seen = HashSet::new();
        for entry in self.import_work(target, policy, &mut seen)? {
            match entry {
                Ok(item) => plan.work.push(item),
                Err(outcome) => plan.skipped.push(outcome),
            }
        }
        let mut seen_descriptors = HashSet::new();
        for entry in self.companion_work(target, policy, &mut seen_descriptors) {
            match entry {
                Ok(pair) => plan.companion_sets.push(pair),
                Err(outcome) => plan.skipped.push(outcome),
            }
        }
        Ok(plan)
    }

    fn import_pass(
        &self,
        target: &WatchTarget,
        admin: &AdminCredential,
        policy: &dyn FreshnessPolicy,
        seen: &mut HashSet<PathBuf>,
        reporter: &dyn RunReporter,
    ) -> Result<Vec<Outcome>, SkipReason> {
        let outcomes = self
            .import_work(target, policy, seen)?
            .into_iter()
            .map(|entry| match entry {
                Ok(item) => import::import(self.service, &item, admin, self.options),
                Err(skip) => skip,
            })
            .inspect(|outcome| reporter.on_outcome(outcome))
            .collect();
        Ok(outcomes)
    }

    fn annotation_pass(
        &self,
        target: &WatchTarget,
        admin: &AdminCredential,
        policy: &dyn FreshnessPolicy,
        seen_descriptors: &mut HashSet<PathBuf>,
        reporter: &dyn RunReporter,
    ) -> Vec<Outcome> {
        let mut pass = AnnotationPass::new(self.service, admin);
        let mut outcomes = Vec::new();
        for entry in self.companion_work(target, policy, seen_descriptors) {
            let produced = match entry {
                Ok((set, identity)) => pass.annotate(&set, &identity),
                Err(skip) => vec![skip],
            };
            for outcome in produced {
                reporter.on_outcome(&outcome);
                outcomes.push(outcome);
            }
        }
        debug!(
            "Annotation pass for {} used {} sessions",
            target.root.display(),
            pass.sessions_opened()
        );
        pass.finish();
        outcomes
    }

    /// Candidates of one target, each either bound to an identity or already
    /// turned into a skip.
    fn import_work(
        &self,
        target: &WatchTarget,
        policy: &dyn FreshnessPolicy,
        seen: &mut HashSet<PathBuf>,
    ) -> Result<Vec<Result<WorkItem, Outcome>>, SkipReason> {
        if !target.root.is_dir() {
            return Err(SkipReason::TargetMissing);
        }
        let matcher = FileMatcher::suffixes(&target.suffixes);
        let located = scanner::locate_with(&target.root, &matcher, policy).map_err(|err| match err {
            LocateError::NoSuffixes => SkipReason::NoSuffixes,
            LocateError::RootUnreadable { source, .. } => SkipReason::RootUnreadable(source.to_string()),
        })?;
        info!(
            "{}: {} new files, {} unreadable",
            target.root.display(),
            located.files.len(),
            located.skipped.len()
        );

        let mut work: Vec<Result<WorkItem, Outcome>> = located
            .skipped
            .into_iter()
            .map(|(path, reason)| Err(Outcome::skipped(Pass::Import, path, SkipReason::Metadata(reason))))
            .collect();

        for file in located.files {
            if !seen.insert(file.path.clone()) {
                debug!("{} already handled in this run", file.path.display());
                work.push(Err(Outcome::skipped(Pass::Import, &file.path, SkipReason::AlreadyQueued)));
                continue;
            }
            let resolved = match self.descriptor.sidecar_for(&file.path, &target.root) {
                Some(sidecar) => self.descriptor.resolve(&sidecar),
                None => Err(ResolveError::Missing(file.path.clone())),
            };
            match resolved {
                Ok(identity) => work.push(Ok(WorkItem { file, identity })),
                Err(err) => work.push(Err(skip_for(Pass::Import, &file.path, err))),
            }
        }
        Ok(work)
    }

    /// Fresh descriptors of one target with their fresh companions. A
    /// descriptor already annotated from an overlapping target is skipped.
    fn companion_work(
        &self,
        target: &WatchTarget,
        policy: &dyn FreshnessPolicy,
        seen_descriptors: &mut HashSet<PathBuf>,
    ) -> Vec<Result<(CompanionSet, ImportIdentity), Outcome>> {
        let matcher = FileMatcher::exact(&self.descriptor.file_name);
        let located = match scanner::locate_with(&target.root, &matcher, policy) {
            Ok(located) => located,
            Err(err) => {
                warn!("Cannot scan {} for descriptors: {}", target.root.display(), err);
                return Vec::new();
            }
        };

        let mut work: Vec<Result<(CompanionSet, ImportIdentity), Outcome>> = located
            .skipped
            .into_iter()
            .map(|(path, reason)| Err(Outcome::skipped(Pass::Annotate, path, SkipReason::Metadata(reason))))
            .collect();

        for descriptor in located.files {
            if !seen_descriptors.insert(descriptor.path.clone()) {
                debug!("{} already annotated in this run", descriptor.path.display());
                work.push(Err(Outcome::skipped(
                    Pass::Annotate,
                    &descriptor.path,
                    SkipReason::AlreadyQueued,
                )));
                continue;
            }
            let dir = descriptor.path.parent().unwrap_or(target.root.as_path());
            let companions = scanner::companions_of(dir, &self.companion_glob, &descriptor.path, policy);
            for (path, reason) in companions.skipped {
                warn!("Skipping companion {}: {}", path.display(), reason);
                work.push(Err(Outcome::skipped(Pass::Annotate, path, SkipReason::Metadata(reason))));
            }
            let set = CompanionSet {
                descriptor: descriptor.path.clone(),
                companions: companions.files.into_iter().map(|c| c.path).collect(),
            };
            match self.descriptor.resolve(&descriptor.path) {
                Ok(identity) => work.push(Ok((set, identity))),
                Err(err) => work.push(Err(skip_for(Pass::Annotate, &descriptor.path, err))),
            }
        }
        work
    }
}

fn skip_for(pass: Pass, path: &Path, err: ResolveError) -> Outcome {
    let reason = if err.is_content_error() {
        warn!("Skipping {}: descriptor present but invalid: {}", path.display(), err);
        SkipReason::DescriptorInvalid(err.to_string())
    } else {
        warn!("Skipping {}: descriptor missing or unreadable: {}", path.display(), err);
        SkipReason::DescriptorMissing(err.to_string())
    };
    Outcome::skipped(pass, path, reason)
}
