mod config;
mod install;
mod outcome;
mod patch;

pub use config::{TargetSpec, ToolConfig, VersionSupport, CONFIG_FILE_NAME};
pub use install::{
    InstallLayout, InstallScope, InstallationRecord, ScopeFilter, COMPANION_PACKAGES,
    RUVECTOR_PACKAGE, RUV_SWARM_PACKAGE,
};
pub use outcome::{EditOutcome, OutcomeTally, Verdict};
pub use patch::{
    EditKind, EditMode, EditOperation, PatchDescriptor, SentinelRule, SentinelRuleSet,
};

#[cfg(test)]
mod tests;
