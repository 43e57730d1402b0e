use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use retrofit_core::ScopeFilter;
use retrofit_locator::{discover_installs, LocatorContext};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepairSource {
    #[default]
    Auto,
    Local,
    Global,
}

impl RepairSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Local => "local",
            Self::Global => "global",
        }
    }

    fn scopes(self) -> &'static [ScopeFilter] {
        match self {
            Self::Auto => &[ScopeFilter::Local, ScopeFilter::Global],
            Self::Local => &[ScopeFilter::Local],
            Self::Global => &[ScopeFilter::Global],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairReport {
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
    pub copied: Vec<String>,
    pub already_present: Vec<String>,
    pub dry_run: bool,
}

pub fn repair(ctx: &LocatorContext, source: RepairSource, dry_run: bool) -> Result<RepairReport> {
    let project_dir = ctx
        .project_dir
        .as_deref()
        .ok_or_else(|| anyhow!("repair requires a target project directory"))?;
    let artifacts_subpath = &ctx.layout.target().artifacts_subpath;
    let target_dir = project_dir.join(artifacts_subpath);
    if let Some(parent) = target_dir.parent() {
        if !parent.is_dir() {
            return Err(anyhow!(
                "no {} directory in {}; initialise the project first",
                parent
                    .strip_prefix(project_dir)
                    .unwrap_or(parent)
                    .display(),
                project_dir.display()
            ));
        }
    }

    let source_dir = find_artifacts_source(ctx, source).ok_or_else(|| {
        anyhow!(
            "no installed {} with {artifacts_subpath} found (source: {})",
            ctx.layout.target().package_name(),
            source.as_str()
        )
    })?;
    debug!(source = %source_dir.display(), target = %target_dir.display(), "repair");

    let mut report = RepairReport {
        source_dir: source_dir.clone(),
        target_dir: target_dir.clone(),
        copied: Vec::new(),
        already_present: Vec::new(),
        dry_run,
    };

    for name in artifact_file_names(&source_dir)? {
        let destination = target_dir.join(&name);
        if destination.exists() {
            report.already_present.push(name);
            continue;
        }
        if !dry_run {
            fs::create_dir_all(&target_dir)
                .with_context(|| format!("failed to create {}", target_dir.display()))?;
            let origin = source_dir.join(&name);
            fs::copy(&origin, &destination).with_context(|| {
                format!(
                    "failed to copy {} -> {}",
                    origin.display(),
                    destination.display()
                )
            })?;
        }
        report.copied.push(name);
    }
    Ok(report)
}

fn find_artifacts_source(ctx: &LocatorContext, source: RepairSource) -> Option<PathBuf> {
    source.scopes().iter().find_map(|scope| {
        discover_installs(ctx, *scope)
            .into_iter()
            .map(|install| ctx.layout.artifacts_dir(&install.package_root))
            .find(|dir| dir.is_dir())
    })
}

fn artifact_file_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => debug!(?name, "skipping non UTF-8 artifact name"),
        }
    }
    names.sort();
    Ok(names)
}
