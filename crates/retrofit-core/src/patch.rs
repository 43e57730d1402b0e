use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    First,
    All,
}

impl EditMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::All => "all",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "first" | "first-occurrence" | "once" => Some(Self::First),
            "all" | "all-occurrences" => Some(Self::All),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOperation {
    pub label: String,
    pub target_file: String,
    pub anchor: String,
    pub replacement: String,
    pub mode: EditMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditKind {
    Textual(Vec<EditOperation>),
    Script(PathBuf),
    Unknown,
}

impl EditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Textual(_) => "textual",
            Self::Script(_) => "script",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_applicable(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentinelRule {
    Present { pattern: String, file: String },
    Absent { pattern: String, file: String },
    None,
}

impl SentinelRule {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Present { .. } => "present",
            Self::Absent { .. } => "absent",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SentinelRuleSet {
    pub package: Option<String>,
    pub rules: Vec<SentinelRule>,
}

impl SentinelRuleSet {
    /// A `none` rule anywhere marks the whole set as making no claim.
    pub fn is_verifiable(&self) -> bool {
        !self.rules.is_empty() && !self.rules.contains(&SentinelRule::None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchDescriptor {
    pub id: String,
    pub order: Option<u32>,
    pub dir_name: String,
    pub slug: String,
    pub prefix: String,
    pub category: String,
    pub title: String,
    pub severity: String,
    pub issue_label: String,
    pub issue_url: String,
    pub target_files: Vec<String>,
    pub declared_ops: u32,
    pub edit_kind: EditKind,
    pub sentinels: SentinelRuleSet,
}

impl PatchDescriptor {
    pub fn operation_count(&self) -> usize {
        match &self.edit_kind {
            EditKind::Textual(ops) => ops.len(),
            EditKind::Script(_) | EditKind::Unknown => self.declared_ops as usize,
        }
    }
}
