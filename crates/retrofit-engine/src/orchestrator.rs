use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use retrofit_catalog::Catalog;
use retrofit_core::{
    EditKind, EditOperation, EditOutcome, InstallScope, InstallationRecord, OutcomeTally,
    PatchDescriptor, ScopeFilter, TargetSpec, VersionSupport,
};
use tracing::{debug, warn};

use crate::edit;
use crate::script::{run_script, ScriptEnv, ScriptInvocation, ScriptRunner, ShellScriptRunner};

#[derive(Debug)]
pub enum RunEvent<'a> {
    InstallStarted {
        install: &'a InstallationRecord,
        index: usize,
        total: usize,
    },
    InstallWarning {
        install: &'a InstallationRecord,
        message: String,
    },
    OperationWarned {
        install: &'a InstallationRecord,
        patch: &'a PatchDescriptor,
        label: &'a str,
        message: String,
    },
    PatchFinished {
        install: &'a InstallationRecord,
        patch: &'a PatchDescriptor,
        tally: OutcomeTally,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallSummary {
    pub root_path: PathBuf,
    pub version: String,
    pub scope: InstallScope,
    pub tally: OutcomeTally,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub totals: OutcomeTally,
    pub installs_processed: usize,
    pub per_patch: BTreeMap<String, OutcomeTally>,
    pub per_install: Vec<InstallSummary>,
}

impl RunSummary {
    pub fn applied(&self) -> u64 {
        self.totals.applied
    }

    pub fn skipped(&self) -> u64 {
        self.totals.skipped
    }

    pub fn warned(&self) -> u64 {
        self.totals.warned
    }

    pub fn summary_line(&self) -> String {
        self.totals.summary_line()
    }
}

pub struct Orchestrator<'a> {
    target: &'a TargetSpec,
    runner: Box<dyn ScriptRunner + 'a>,
    extra_args: Vec<String>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(target: &'a TargetSpec) -> Self {
        Self::with_runner(target, ShellScriptRunner)
    }

    pub fn with_runner(target: &'a TargetSpec, runner: impl ScriptRunner + 'a) -> Self {
        Self {
            target,
            runner: Box::new(runner),
            extra_args: Vec::new(),
        }
    }

    pub fn extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn run(
        &self,
        catalog: &Catalog,
        installs: &[InstallationRecord],
        scope: ScopeFilter,
    ) -> RunSummary {
        self.run_with_observer(catalog, installs, scope, |_| {})
    }

    pub fn run_with_observer<F>(
        &self,
        catalog: &Catalog,
        installs: &[InstallationRecord],
        scope: ScopeFilter,
        mut observe: F,
    ) -> RunSummary
    where
        F: FnMut(RunEvent<'_>),
    {
        let selected = installs
            .iter()
            .filter(|install| scope.includes(install.scope))
            .collect::<Vec<_>>();
        let patches = catalog
            .patches()
            .iter()
            .filter(|patch| patch.edit_kind.is_applicable())
            .collect::<Vec<_>>();

        let mut summary = RunSummary::default();
        for (index, install) in selected.iter().copied().enumerate() {
            observe(RunEvent::InstallStarted {
                install,
                index,
                total: selected.len(),
            });
            for message in self.install_warnings(install) {
                warn!(path = %install.root_path.display(), "{message}");
                observe(RunEvent::InstallWarning { install, message });
            }

            let mut install_tally = OutcomeTally::default();
            for patch in patches.iter().copied() {
                let tally = self.apply_patch(install, patch, &mut observe);
                observe(RunEvent::PatchFinished {
                    install,
                    patch,
                    tally,
                });
                *summary.per_patch.entry(patch.id.clone()).or_default() += tally;
                install_tally += tally;
            }

            summary.totals += install_tally;
            summary.installs_processed += 1;
            summary.per_install.push(InstallSummary {
                root_path: install.root_path.clone(),
                version: install.version.clone(),
                scope: install.scope,
                tally: install_tally,
            });
        }
        summary
    }

    fn install_warnings(&self, install: &InstallationRecord) -> Vec<String> {
        let mut messages = Vec::new();
        if !install.writable {
            messages.push(format!(
                "install is not writable; edits will likely fail: {}",
                install.root_path.display()
            ));
        }
        match self.target.version_support(&install.version) {
            VersionSupport::Unsupported { requirement } => messages.push(format!(
                "{} {} is outside the supported range {requirement}",
                self.target.package_name(),
                install.display_version()
            )),
            VersionSupport::Unknown => messages.push(format!(
                "{} version {} cannot be checked against the supported range",
                self.target.package_name(),
                install.display_version()
            )),
            VersionSupport::Supported | VersionSupport::Unconstrained => {}
        }
        messages
    }

    fn apply_patch<F>(
        &self,
        install: &InstallationRecord,
        patch: &PatchDescriptor,
        observe: &mut F,
    ) -> OutcomeTally
    where
        F: FnMut(RunEvent<'_>),
    {
        match &patch.edit_kind {
            EditKind::Textual(ops) => {
                if !self.extra_args.is_empty() {
                    debug!(patch = %patch.id, "extra arguments ignored for textual patch");
                }
                let mut tally = OutcomeTally::default();
                let package = patch.sentinels.package.as_deref();
                let Some(base) = install.base_for(package, &self.target.package_name()) else {
                    debug!(
                        patch = %patch.id,
                        package = ?package,
                        "companion package not installed here"
                    );
                    for _ in ops {
                        tally.record(EditOutcome::Unreachable);
                    }
                    return tally;
                };
                for op in ops {
                    let outcome = self.apply_operation(install, base, patch, op, observe);
                    tally.record(outcome);
                }
                tally
            }
            EditKind::Script(script) => {
                let env = ScriptEnv::for_install(install);
                let invocation = ScriptInvocation {
                    script,
                    env: &env,
                    extra_args: &self.extra_args,
                };
                run_script(self.runner.as_ref(), &invocation)
            }
            EditKind::Unknown => OutcomeTally::default(),
        }
    }

    fn apply_operation<F>(
        &self,
        install: &InstallationRecord,
        base: &Path,
        patch: &PatchDescriptor,
        op: &EditOperation,
        observe: &mut F,
    ) -> EditOutcome
    where
        F: FnMut(RunEvent<'_>),
    {
        let file = base.join(&op.target_file);
        let message = match edit::apply(&file, &op.anchor, &op.replacement, op.mode) {
            Ok(EditOutcome::Drifted) => "pattern not found (code may have changed)".to_string(),
            Ok(outcome) => {
                debug!(
                    label = %op.label,
                    path = %file.display(),
                    outcome = outcome.as_str(),
                    "edit"
                );
                return outcome;
            }
            Err(err) => format!("{err:#}"),
        };

        warn!(label = %op.label, path = %file.display(), "{message}");
        observe(RunEvent::OperationWarned {
            install,
            patch,
            label: &op.label,
            message,
        });
        EditOutcome::Drifted
    }
}
