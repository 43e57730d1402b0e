use std::path::{Component, Path};

use anyhow::{anyhow, Context, Result};
use retrofit_core::{EditMode, EditOperation};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OpsFile {
    #[serde(default, rename = "op")]
    ops: Vec<RawOperation>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOperation {
    label: Option<String>,
    file: String,
    old: String,
    new: String,
    mode: Option<String>,
}

/// Parses a `fix.toml` op file into edit operations, in file order.
pub(crate) fn parse_ops_file(input: &str, patch_id: &str) -> Result<Vec<EditOperation>> {
    let parsed: OpsFile = toml::from_str(input).context("failed to parse op file")?;
    if parsed.ops.is_empty() {
        return Err(anyhow!("op file declares no [[op]] entries"));
    }

    parsed
        .ops
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| {
            let position = idx + 1;
            validate_target_file(&raw.file)
                .with_context(|| format!("invalid file for op {position}"))?;
            if raw.old.is_empty() {
                return Err(anyhow!("op {position} has an empty 'old' anchor"));
            }
            if raw.new.is_empty() {
                return Err(anyhow!(
                    "op {position} has an empty 'new' text, which always counts as applied"
                ));
            }
            if raw.old == raw.new {
                return Err(anyhow!("op {position} replaces text with itself"));
            }
            let mode = match raw.mode.as_deref() {
                None => EditMode::First,
                Some(value) => EditMode::parse(value).ok_or_else(|| {
                    anyhow!("op {position} has invalid mode '{value}': expected first or all")
                })?,
            };
            let label = raw
                .label
                .filter(|label| !label.trim().is_empty())
                .unwrap_or_else(|| format!("{patch_id} op {position}"));

            Ok(EditOperation {
                label,
                target_file: raw.file,
                anchor: raw.old,
                replacement: raw.new,
                mode,
            })
        })
        .collect()
}

fn validate_target_file(file: &str) -> Result<()> {
    let path = Path::new(file);
    if file.trim().is_empty() {
        return Err(anyhow!("target file must not be empty"));
    }
    if path
        .components()
        .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir))
    {
        return Err(anyhow!(
            "target file must stay inside the installation: {file}"
        ));
    }
    Ok(())
}
