use std::path::{Path, PathBuf};

use retrofit_core::{InstallLayout, TargetSpec};

pub const NODE_MODULES_DIR: &str = "node_modules";
pub const PACKAGE_MANIFEST_FILE: &str = "package.json";

/// Path arithmetic for the tracked package inside a `node_modules` tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
    target: TargetSpec,
}

impl PackageLayout {
    pub fn new(target: TargetSpec) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &TargetSpec {
        &self.target
    }

    /// `node_modules/<scope>/<name>`
    pub fn direct_package_dir(&self, node_modules: &Path) -> PathBuf {
        node_modules.join(self.target.package_rel_path())
    }

    /// `node_modules/<umbrella>/<scope>/<name>` for each configured umbrella path.
    pub fn nested_package_dirs(&self, node_modules: &Path) -> Vec<PathBuf> {
        self.target
            .umbrella_paths
            .iter()
            .map(|umbrella| {
                node_modules
                    .join(umbrella)
                    .join(self.target.package_rel_path())
            })
            .collect()
    }

    /// Every package directory a `node_modules` tree could hold, direct layout first.
    pub fn package_dir_candidates(&self, node_modules: &Path) -> Vec<(InstallLayout, PathBuf)> {
        let mut candidates = vec![(InstallLayout::Direct, self.direct_package_dir(node_modules))];
        candidates.extend(
            self.nested_package_dirs(node_modules)
                .into_iter()
                .map(|dir| (InstallLayout::Nested, dir)),
        );
        candidates
    }

    pub fn src_dir(&self, package_dir: &Path) -> PathBuf {
        package_dir.join(&self.target.src_subpath)
    }

    pub fn manifest_path(&self, package_dir: &Path) -> PathBuf {
        package_dir.join(PACKAGE_MANIFEST_FILE)
    }

    pub fn artifacts_dir(&self, package_dir: &Path) -> PathBuf {
        package_dir.join(&self.target.artifacts_subpath)
    }

    pub fn project_node_modules(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(NODE_MODULES_DIR)
    }
}
