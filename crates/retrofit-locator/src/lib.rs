use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use retrofit_core::{
    InstallLayout, InstallScope, InstallationRecord, ScopeFilter, TargetSpec, COMPANION_PACKAGES,
};
use tracing::debug;

mod layout;
mod roots;

pub use layout::{PackageLayout, NODE_MODULES_DIR, PACKAGE_MANIFEST_FILE};
pub use roots::{
    default_npx_cache_roots, global_module_dir, global_prefix_from, npx_cache_roots_from,
};

/// Where discovery looks. Built once by the caller; the locator itself never
/// reads the process environment.
#[derive(Debug, Clone)]
pub struct LocatorContext {
    pub layout: PackageLayout,
    /// Project directory whose `node_modules` holds project-local installs.
    pub project_dir: Option<PathBuf>,
    /// npx cache roots (`.../_npx`); each child is a hash directory.
    pub npx_cache_roots: Vec<PathBuf>,
    /// Global `node_modules` directories.
    pub global_module_dirs: Vec<PathBuf>,
}

impl LocatorContext {
    pub fn new(target: TargetSpec) -> Self {
        Self {
            layout: PackageLayout::new(target),
            project_dir: None,
            npx_cache_roots: Vec::new(),
            global_module_dirs: Vec::new(),
        }
    }

    pub fn with_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = Some(dir.into());
        self
    }

    pub fn with_npx_cache_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.npx_cache_roots = roots;
        self
    }

    pub fn with_global_prefix(mut self, prefix: Option<&Path>) -> Self {
        if let Some(prefix) = prefix {
            self.global_module_dirs.push(global_module_dir(prefix));
        }
        self
    }
}

/// Finds every distinct installation for the requested scope.
///
/// Project-local installs come first, then npx cache hash directories (sorted
/// by name), then global module directories. Records are deduplicated on their
/// canonical source path; missing or unreadable roots contribute nothing.
pub fn discover_installs(ctx: &LocatorContext, scope: ScopeFilter) -> Vec<InstallationRecord> {
    let mut scan = Scan::new(&ctx.layout);

    if scope.wants_local() {
        if let Some(project_dir) = &ctx.project_dir {
            let node_modules = ctx.layout.project_node_modules(project_dir);
            scan.node_modules(&node_modules, InstallScope::ProjectLocal);
        }
    }

    if scope.wants_global() {
        for root in &ctx.npx_cache_roots {
            for node_modules in npx_node_modules_dirs(root) {
                scan.node_modules(&node_modules, InstallScope::UserGlobal);
            }
        }
        for module_dir in &ctx.global_module_dirs {
            scan.node_modules(module_dir, InstallScope::UserGlobal);
        }
    }

    scan.records
}

struct Scan<'a> {
    layout: &'a PackageLayout,
    seen: HashSet<PathBuf>,
    records: Vec<InstallationRecord>,
}

impl<'a> Scan<'a> {
    fn new(layout: &'a PackageLayout) -> Self {
        Self {
            layout,
            seen: HashSet::new(),
            records: Vec::new(),
        }
    }

    fn node_modules(&mut self, node_modules: &Path, scope: InstallScope) {
        if !node_modules.is_dir() {
            return;
        }
        for (install_layout, package_dir) in self.layout.package_dir_candidates(node_modules) {
            self.candidate(node_modules, &package_dir, install_layout, scope);
        }
    }

    fn candidate(
        &mut self,
        node_modules: &Path,
        package_dir: &Path,
        install_layout: InstallLayout,
        scope: InstallScope,
    ) {
        let src_dir = self.layout.src_dir(package_dir);
        if !src_dir.is_dir() {
            return;
        }

        let (root_path, package_root) =
            match (fs::canonicalize(&src_dir), fs::canonicalize(package_dir)) {
                (Ok(root_path), Ok(package_root)) => (root_path, package_root),
                (Err(err), _) | (_, Err(err)) => {
                    debug!(path = %src_dir.display(), "cannot canonicalize candidate: {err}");
                    return;
                }
            };
        if !self.seen.insert(root_path.clone()) {
            debug!(path = %root_path.display(), "duplicate install dropped");
            return;
        }

        let version = read_declared_version(&self.layout.manifest_path(package_dir));
        let writable = probe_writable(&root_path);
        let companions = companion_roots(node_modules);
        debug!(
            path = %root_path.display(),
            version = %version,
            layout = install_layout.as_str(),
            scope = scope.as_str(),
            writable,
            companions = companions.len(),
            "found install"
        );

        self.records.push(InstallationRecord {
            root_path,
            package_root,
            version,
            scope,
            layout: install_layout,
            writable,
            companions,
        });
    }
}

/// Companion packages sitting in the same `node_modules` as an install.
pub fn companion_roots(node_modules: &Path) -> BTreeMap<String, PathBuf> {
    COMPANION_PACKAGES
        .iter()
        .filter_map(|name| {
            let dir = node_modules.join(name);
            if !dir.join(PACKAGE_MANIFEST_FILE).is_file() {
                return None;
            }
            match fs::canonicalize(&dir) {
                Ok(root) => Some((name.to_string(), root)),
                Err(err) => {
                    debug!(path = %dir.display(), "cannot canonicalize companion: {err}");
                    None
                }
            }
        })
        .collect()
}

fn npx_node_modules_dirs(root: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(root = %root.display(), "skipping npx cache root: {err}");
            return Vec::new();
        }
    };

    let mut hash_dirs = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect::<Vec<_>>();
    hash_dirs.sort();
    hash_dirs
        .into_iter()
        .map(|dir| dir.join(NODE_MODULES_DIR))
        .collect()
}

/// `version` from a package manifest, or an empty string on any failure.
pub fn read_declared_version(manifest_path: &Path) -> String {
    let Ok(raw) = fs::read_to_string(manifest_path) else {
        return String::new();
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&raw) else {
        debug!(path = %manifest_path.display(), "unparseable package manifest");
        return String::new();
    };
    value
        .get("version")
        .and_then(serde_json::Value::as_str)
        .map(|version| version.trim().to_string())
        .unwrap_or_default()
}

/// Write-permission check without writing anything.
#[cfg(unix)]
pub fn probe_writable(path: &Path) -> bool {
    rustix::fs::access(path, rustix::fs::Access::WRITE_OK).is_ok()
}

#[cfg(not(unix))]
pub fn probe_writable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|metadata| !metadata.permissions().readonly())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests;
