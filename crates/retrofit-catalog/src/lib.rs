use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use retrofit_core::{EditKind, PatchDescriptor, SentinelRuleSet, ToolConfig};
use tracing::{debug, warn};

mod filter;
mod metadata;
mod naming;
mod ops_file;
mod sentinel;

pub use filter::PatchFilter;

pub const METADATA_FILE: &str = "README.md";
pub const SENTINEL_FILE: &str = "sentinel";
pub const SCRIPT_FILE: &str = "fix.sh";
pub const OPS_FILE: &str = "fix.toml";

/// Ordered, immutable set of patch descriptors read from a catalog directory.
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
    patches: Vec<PatchDescriptor>,
}

impl Catalog {
    /// Scans `root` for patch directories. Directories without a metadata
    /// document, or whose documents cannot be parsed, are left out.
    pub fn load(root: impl Into<PathBuf>, config: &ToolConfig) -> Result<Self> {
        let root = root.into();
        let mut dir_names = Vec::new();
        for entry in fs::read_dir(&root)
            .with_context(|| format!("failed to read patch catalog: {}", root.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => dir_names.push(name),
                Err(name) => debug!(?name, "skipping non UTF-8 catalog directory"),
            }
        }
        dir_names.sort();

        let mut patches = Vec::new();
        for dir_name in dir_names {
            match load_descriptor(&root.join(&dir_name), &dir_name, config) {
                Ok(Some(descriptor)) => patches.push(descriptor),
                Ok(None) => debug!(dir = %dir_name, "no {METADATA_FILE}; not a catalog entry"),
                Err(err) => warn!(dir = %dir_name, "excluding catalog entry: {err:#}"),
            }
        }

        Ok(Self::from_descriptors(root, patches))
    }

    /// Orders `patches` and keeps the first entry for each id; later
    /// directories reusing an id are dropped with a warning.
    pub fn from_descriptors(root: impl Into<PathBuf>, mut patches: Vec<PatchDescriptor>) -> Self {
        sort_descriptors(&mut patches);
        let mut seen = HashSet::new();
        patches.retain(|patch| {
            if seen.insert(patch.id.clone()) {
                return true;
            }
            warn!(
                id = %patch.id,
                dir = %patch.dir_name,
                "excluding catalog entry: duplicate patch id"
            );
            false
        });
        Self {
            root: root.into(),
            patches,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn patches(&self) -> &[PatchDescriptor] {
        &self.patches
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.patches.iter().map(|patch| patch.id.as_str()).collect()
    }

    /// Resolves a patch by id or by id-prefix match against directory names.
    pub fn find_by_id(&self, id: &str) -> Result<&PatchDescriptor> {
        let requested = id.trim();
        if requested.is_empty() {
            return Err(anyhow!("a patch id is required"));
        }

        self.patches
            .iter()
            .find(|patch| patch.id == requested || dir_matches_id(&patch.dir_name, requested))
            .ok_or_else(|| {
                anyhow!(
                    "no patch found for '{requested}'; available: {}",
                    self.ids().join(", ")
                )
            })
    }

    pub fn filtered(&self, filter: &PatchFilter) -> Self {
        Self {
            root: self.root.clone(),
            patches: self
                .patches
                .iter()
                .filter(|patch| filter.matches(&patch.dir_name))
                .cloned()
                .collect(),
        }
    }

    /// Category labels keyed by id prefix, for the prefixes present in the catalog.
    pub fn categories(&self) -> BTreeMap<String, String> {
        self.patches
            .iter()
            .map(|patch| (patch.prefix.clone(), patch.category.clone()))
            .collect()
    }
}

fn dir_matches_id(dir_name: &str, id: &str) -> bool {
    let stripped = naming::parse_dir_name(dir_name).stripped;
    [dir_name, stripped.as_str()].iter().any(|name| {
        *name == id
            || name
                .strip_prefix(id)
                .is_some_and(|rest| rest.starts_with('-'))
    })
}

fn sort_descriptors(patches: &mut [PatchDescriptor]) {
    patches.sort_by(|left, right| {
        let left_order = left.order.unwrap_or(u32::MAX);
        let right_order = right.order.unwrap_or(u32::MAX);
        left_order
            .cmp(&right_order)
            .then_with(|| left.order.is_none().cmp(&right.order.is_none()))
            .then_with(|| left.id.cmp(&right.id))
            .then_with(|| left.dir_name.cmp(&right.dir_name))
    });
}

fn load_descriptor(
    dir: &Path,
    dir_name: &str,
    config: &ToolConfig,
) -> Result<Option<PatchDescriptor>> {
    let readme_path = dir.join(METADATA_FILE);
    if !readme_path.is_file() {
        return Ok(None);
    }

    let raw = fs::read_to_string(&readme_path)
        .with_context(|| format!("failed to read {}", readme_path.display()))?;
    let meta = metadata::parse_metadata(&raw);
    let name = naming::parse_dir_name(dir_name);
    let id = meta
        .id
        .clone()
        .or_else(|| name.id.clone())
        .ok_or_else(|| anyhow!("cannot derive a patch id from '{dir_name}'"))?;

    let sentinel_path = dir.join(SENTINEL_FILE);
    let sentinels = if sentinel_path.is_file() {
        let raw = fs::read_to_string(&sentinel_path)
            .with_context(|| format!("failed to read {}", sentinel_path.display()))?;
        sentinel::parse_sentinels(&raw)
    } else {
        SentinelRuleSet::default()
    };

    let edit_kind = infer_edit_kind(dir, &id)?;
    let prefix = naming::id_prefix(&id).to_string();
    let category = config.category_label(&prefix).to_string();

    Ok(Some(PatchDescriptor {
        order: name.order,
        dir_name: dir_name.to_string(),
        slug: name.slug,
        category,
        prefix,
        title: meta.title,
        severity: meta.severity,
        issue_label: meta.issue_label,
        issue_url: meta.issue_url,
        target_files: meta.files,
        declared_ops: meta.ops,
        edit_kind,
        sentinels,
        id,
    }))
}

fn infer_edit_kind(dir: &Path, id: &str) -> Result<EditKind> {
    let script = dir.join(SCRIPT_FILE);
    if script.is_file() {
        return Ok(EditKind::Script(script));
    }

    let ops_path = dir.join(OPS_FILE);
    if ops_path.is_file() {
        let raw = fs::read_to_string(&ops_path)
            .with_context(|| format!("failed to read {}", ops_path.display()))?;
        let ops = ops_file::parse_ops_file(&raw, id)
            .with_context(|| format!("invalid {}", ops_path.display()))?;
        return Ok(EditKind::Textual(ops));
    }

    Ok(EditKind::Unknown)
}
