use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Context};
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "retrofit.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolConfig {
    pub target: TargetSpec,
    pub categories: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TargetSpec {
    pub scope: String,
    pub name: String,
    pub src_subpath: String,
    pub umbrella_paths: Vec<String>,
    pub supported: Option<VersionReq>,
    pub artifacts_subpath: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSupport {
    Supported,
    Unsupported { requirement: String },
    Unknown,
    Unconstrained,
}

impl Default for ToolConfig {
    fn default() -> Self {
        let categories = [
            ("CF", "Config & Doctor"),
            ("DM", "Daemon & Workers"),
            ("HK", "Hooks"),
            ("HW", "Headless Worker"),
            ("IN", "Intelligence"),
            ("MM", "Memory Management"),
            ("RS", "ruv-swarm"),
            ("RV", "RuVector Intelligence"),
            ("SG", "Settings Generator"),
            ("UI", "Display & Cosmetic"),
            ("WM", "Memory Wiring"),
        ]
        .into_iter()
        .map(|(prefix, label)| (prefix.to_string(), label.to_string()))
        .collect();

        Self {
            target: TargetSpec::default(),
            categories,
        }
    }
}

impl Default for TargetSpec {
    fn default() -> Self {
        Self {
            scope: "@claude-flow".to_string(),
            name: "cli".to_string(),
            src_subpath: "dist/src".to_string(),
            umbrella_paths: vec![
                "claude-flow/v3".to_string(),
                "claude-flow/node_modules".to_string(),
            ],
            supported: None,
            artifacts_subpath: ".claude/helpers".to_string(),
        }
    }
}

impl ToolConfig {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(input).context("failed to parse retrofit config")?;
        config.target.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("invalid config: {}", path.display()))
    }

    pub fn category_label<'a>(&'a self, prefix: &'a str) -> &'a str {
        self.categories
            .get(prefix)
            .map(String::as_str)
            .unwrap_or(prefix)
    }
}

impl TargetSpec {
    pub fn package_name(&self) -> String {
        if self.scope.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.scope, self.name)
        }
    }

    pub fn package_rel_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        if !self.scope.is_empty() {
            path.push(&self.scope);
        }
        path.push(&self.name);
        path
    }

    pub fn version_support(&self, version: &str) -> VersionSupport {
        let Some(requirement) = &self.supported else {
            return VersionSupport::Unconstrained;
        };
        let Ok(parsed) = Version::parse(version.trim()) else {
            return VersionSupport::Unknown;
        };
        if requirement.matches(&parsed) {
            VersionSupport::Supported
        } else {
            VersionSupport::Unsupported {
                requirement: requirement.to_string(),
            }
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow!("target package name must not be empty"));
        }
        if !self.scope.is_empty() && !self.scope.starts_with('@') {
            return Err(anyhow!(
                "target package scope must start with '@': {}",
                self.scope
            ));
        }
        validate_relative_subpath("src_subpath", &self.src_subpath)?;
        validate_relative_subpath("artifacts_subpath", &self.artifacts_subpath)?;
        for umbrella in &self.umbrella_paths {
            validate_relative_subpath("umbrella_paths", umbrella)?;
        }
        Ok(())
    }
}

fn validate_relative_subpath(field: &str, value: &str) -> anyhow::Result<()> {
    let path = Path::new(value);
    if path.as_os_str().is_empty() {
        return Err(anyhow!("{field} must not be empty"));
    }
    if path
        .components()
        .any(|component| !matches!(component, Component::Normal(_)))
    {
        return Err(anyhow!(
            "{field} must be a plain relative path without '..': {value}"
        ));
    }
    Ok(())
}
