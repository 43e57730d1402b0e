use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use retrofit_core::{EditMode, EditOutcome};
use tempfile::NamedTempFile;
use tracing::debug;

pub fn apply_first(file: &Path, anchor: &str, replacement: &str) -> Result<EditOutcome> {
    apply(file, anchor, replacement, EditMode::First)
}

/// Replaces every occurrence of `anchor`. Content holding both the anchor and
/// the replacement is treated as partially applied and rewritten.
pub fn apply_all(file: &Path, anchor: &str, replacement: &str) -> Result<EditOutcome> {
    apply(file, anchor, replacement, EditMode::All)
}

pub fn apply(file: &Path, anchor: &str, replacement: &str, mode: EditMode) -> Result<EditOutcome> {
    if anchor.is_empty() {
        return Err(anyhow!("edit anchor must not be empty"));
    }
    let Some(content) = read_target(file)? else {
        return Ok(EditOutcome::Unreachable);
    };

    let anchor_present = content.contains(anchor);
    let already_applied = match mode {
        EditMode::First => content.contains(replacement),
        EditMode::All => content.contains(replacement) && !anchor_present,
    };
    if already_applied {
        return Ok(EditOutcome::AlreadyApplied);
    }
    if !anchor_present {
        return Ok(EditOutcome::Drifted);
    }

    let updated = match mode {
        EditMode::First => content.replacen(anchor, replacement, 1),
        EditMode::All => content.replace(anchor, replacement),
    };
    write_atomic(file, &updated)?;
    Ok(EditOutcome::Applied)
}

fn read_target(file: &Path) -> Result<Option<String>> {
    if file.as_os_str().is_empty() {
        return Ok(None);
    }
    match fs::read_to_string(file) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %file.display(), "edit target missing");
            Ok(None)
        }
        Err(err) => Err(err).with_context(|| format!("failed to read {}", file.display())),
    }
}

pub fn write_atomic(file: &Path, contents: &str) -> Result<()> {
    let target = fs::canonicalize(file)
        .with_context(|| format!("failed to resolve {}", file.display()))?;
    let permissions = fs::metadata(&target)
        .with_context(|| format!("failed to stat {}", target.display()))?
        .permissions();
    let dir = target
        .parent()
        .ok_or_else(|| anyhow!("edit target has no parent: {}", target.display()))?;

    let mut staged = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to stage write in {}", dir.display()))?;
    staged
        .write_all(contents.as_bytes())
        .with_context(|| format!("failed to write staged copy of {}", target.display()))?;
    staged
        .as_file()
        .set_permissions(permissions)
        .with_context(|| format!("failed to copy permissions onto {}", target.display()))?;
    staged
        .persist(&target)
        .map_err(|err| err.error)
        .with_context(|| format!("failed to replace {}", target.display()))?;
    Ok(())
}
