use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const RUVECTOR_PACKAGE: &str = "ruvector";
pub const RUV_SWARM_PACKAGE: &str = "ruv-swarm";
pub const COMPANION_PACKAGES: [&str; 2] = [RUVECTOR_PACKAGE, RUV_SWARM_PACKAGE];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InstallScope {
    ProjectLocal,
    UserGlobal,
}

impl InstallScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProjectLocal => "local",
            Self::UserGlobal => "global",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InstallLayout {
    Direct,
    Nested,
}

impl InstallLayout {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Nested => "nested",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeFilter {
    Local,
    Global,
    #[default]
    Both,
}

impl ScopeFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Global => "global",
            Self::Both => "both",
        }
    }

    pub fn includes(self, scope: InstallScope) -> bool {
        match self {
            Self::Local => scope == InstallScope::ProjectLocal,
            Self::Global => scope == InstallScope::UserGlobal,
            Self::Both => true,
        }
    }

    pub fn wants_local(self) -> bool {
        self.includes(InstallScope::ProjectLocal)
    }

    pub fn wants_global(self) -> bool {
        self.includes(InstallScope::UserGlobal)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationRecord {
    pub root_path: PathBuf,
    pub package_root: PathBuf,
    pub version: String,
    pub scope: InstallScope,
    pub layout: InstallLayout,
    pub writable: bool,
    pub companions: BTreeMap<String, PathBuf>,
}

impl InstallationRecord {
    pub fn display_version(&self) -> &str {
        if self.version.is_empty() {
            "unknown"
        } else {
            &self.version
        }
    }

    pub fn companion_root(&self, package: &str) -> Option<&Path> {
        self.companions.get(package).map(PathBuf::as_path)
    }

    /// Directory that paths of a patch scoped to `package` are relative to.
    /// `None` when the patch targets a companion this install does not have.
    pub fn base_for(&self, package: Option<&str>, tracked_package: &str) -> Option<&Path> {
        match package {
            None => Some(&self.root_path),
            Some(name) if name == tracked_package => Some(&self.root_path),
            Some(name) => self.companion_root(name),
        }
    }
}
