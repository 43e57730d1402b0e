use retrofit_catalog::Catalog;
use retrofit_core::{InstallationRecord, PatchDescriptor, TargetSpec, Verdict};

use crate::verify::verify_set;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckEntry {
    pub patch_id: String,
    pub title: String,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallCheck {
    pub install: InstallationRecord,
    pub entries: Vec<CheckEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CheckReport {
    pub installs: Vec<InstallCheck>,
}

impl CheckReport {
    pub fn count(&self, verdict: Verdict) -> usize {
        self.installs
            .iter()
            .flat_map(|install| &install.entries)
            .filter(|entry| entry.verdict == verdict)
            .count()
    }

    pub fn has_failures(&self) -> bool {
        self.count(Verdict::Fail) > 0
    }
}

pub fn check_installs(
    catalog: &Catalog,
    installs: &[InstallationRecord],
    target: &TargetSpec,
) -> CheckReport {
    let package_name = target.package_name();
    let installs = installs
        .iter()
        .map(|install| InstallCheck {
            install: install.clone(),
            entries: catalog
                .patches()
                .iter()
                .map(|patch| CheckEntry {
                    patch_id: patch.id.clone(),
                    title: patch.title.clone(),
                    verdict: check_patch(patch, install, &package_name),
                })
                .collect(),
        })
        .collect();
    CheckReport { installs }
}

fn check_patch(
    patch: &PatchDescriptor,
    install: &InstallationRecord,
    package_name: &str,
) -> Verdict {
    // Rules for a companion this install lacks have nothing to check.
    match install.base_for(patch.sentinels.package.as_deref(), package_name) {
        Some(base) => verify_set(&patch.sentinels, base),
        None => Verdict::Inapplicable,
    }
}
