use anyhow::{Context, Result};
use regex::Regex;

/// Include/exclude regexes matched against catalog directory names. Include is
/// applied first, then exclude.
#[derive(Debug, Clone, Default)]
pub struct PatchFilter {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl PatchFilter {
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Result<Self> {
        Ok(Self {
            include: compile("include", include)?,
            exclude: compile("exclude", exclude)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_none() && self.exclude.is_none()
    }

    pub fn matches(&self, dir_name: &str) -> bool {
        if let Some(include) = &self.include {
            if !include.is_match(dir_name) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(dir_name) {
                return false;
            }
        }
        true
    }
}

fn compile(kind: &str, pattern: Option<&str>) -> Result<Option<Regex>> {
    let Some(pattern) = pattern.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    let regex =
        Regex::new(pattern).with_context(|| format!("invalid --{kind} pattern: {pattern}"))?;
    Ok(Some(regex))
}
