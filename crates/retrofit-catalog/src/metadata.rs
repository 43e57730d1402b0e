//! Grammar for a patch directory's `README.md`.
//!
//! ```text
//! # HW-001: Headless worker hangs on stdin
//! **Severity**: High
//! **GitHub**: [#1111](https://github.com/org/repo/issues/1111)
//! ## Files Patched
//! - `services/headless-worker-executor.js`
//!
//! ## Ops
//! 1 op in fix.toml
//! ```

const SEVERITY_MARKER: &str = "**Severity**";
const ISSUE_MARKER: &str = "**GitHub**";
const UNKNOWN_SEVERITY: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct PatchMetadata {
    /// Id from the title line; absent when line 1 does not follow `# <ID>: <Title>`.
    pub id: Option<String>,
    pub title: String,
    pub severity: String,
    pub issue_label: String,
    pub issue_url: String,
    pub files: Vec<String>,
    pub ops: u32,
}

pub(crate) fn parse_metadata(text: &str) -> PatchMetadata {
    let lines = text.lines().collect::<Vec<_>>();

    let (id, title) = lines
        .first()
        .and_then(|line| parse_title_line(line))
        .map(|(id, title)| (Some(id), title))
        .unwrap_or((None, String::new()));

    let severity = lines
        .iter()
        .find(|line| line.starts_with(SEVERITY_MARKER))
        .and_then(|line| parse_severity_line(line))
        .unwrap_or_else(|| UNKNOWN_SEVERITY.to_string());

    let (issue_label, issue_url) = lines
        .iter()
        .find(|line| line.starts_with(ISSUE_MARKER))
        .and_then(|line| parse_markdown_link(line))
        .unwrap_or_default();

    let ops = lines
        .iter()
        .find_map(|line| parse_ops_line(line))
        .unwrap_or(0);

    PatchMetadata {
        id,
        title,
        severity,
        issue_label,
        issue_url,
        files: parse_files_patched(&lines),
        ops,
    }
}

/// `# <ID>: <Title>`
pub(crate) fn parse_title_line(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix('#')?;
    if !starts_with_whitespace(rest) {
        return None;
    }
    let rest = rest.trim_start();
    let (token, title) = rest.split_once(char::is_whitespace)?;
    let id = token.strip_suffix(':')?;
    let title = title.trim();
    if id.is_empty() || title.is_empty() {
        return None;
    }
    Some((id.to_string(), title.to_string()))
}

/// `**Severity**: <word>`
pub(crate) fn parse_severity_line(line: &str) -> Option<String> {
    let rest = line.strip_prefix(SEVERITY_MARKER)?.strip_prefix(':')?;
    rest.split_whitespace().next().map(str::to_string)
}

/// First `[label](url)` on the line.
pub(crate) fn parse_markdown_link(line: &str) -> Option<(String, String)> {
    let mut search_from = 0;
    while let Some(open) = line[search_from..].find('[') {
        let label_start = search_from + open + 1;
        let close = line[label_start..].find(']')?;
        let label_end = label_start + close;
        let after_label = &line[label_end + 1..];
        if let Some(url_part) = after_label.strip_prefix('(') {
            if let Some(url_end) = url_part.find(')') {
                let label = &line[label_start..label_end];
                let url = &url_part[..url_end];
                if !label.is_empty() && !url.is_empty() {
                    return Some((label.to_string(), url.to_string()));
                }
            }
        }
        search_from = label_start;
    }
    None
}

/// `^\d+\s+ops?\b`, case-insensitive.
pub(crate) fn parse_ops_line(line: &str) -> Option<u32> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    if !starts_with_whitespace(rest) {
        return None;
    }
    let word = rest.trim_start();
    let lower = word.to_ascii_lowercase();
    let after = lower
        .strip_prefix("ops")
        .or_else(|| lower.strip_prefix("op"))?;
    if after
        .chars()
        .next()
        .is_some_and(|ch| ch.is_alphanumeric() || ch == '_')
    {
        return None;
    }
    line[..digits].parse().ok()
}

fn parse_files_patched(lines: &[&str]) -> Vec<String> {
    let Some(heading) = lines.iter().position(|line| is_files_heading(line)) else {
        return Vec::new();
    };

    let mut files = Vec::new();
    for line in &lines[heading + 1..] {
        if let Some(file) = parse_bullet(line) {
            files.push(file);
        } else if line.starts_with('#') || (line.trim().is_empty() && !files.is_empty()) {
            break;
        }
    }
    files
}

fn is_files_heading(line: &str) -> bool {
    let Some(rest) = line.strip_prefix("##") else {
        return false;
    };
    if !starts_with_whitespace(rest) {
        return false;
    }
    rest.trim_start()
        .to_ascii_lowercase()
        .starts_with("files patched")
}

/// ``- path`` or ``- `path` ``
pub(crate) fn parse_bullet(line: &str) -> Option<String> {
    let rest = line.strip_prefix('-')?;
    if !starts_with_whitespace(rest) {
        return None;
    }
    let body = rest.trim();
    let body = body.strip_prefix('`').unwrap_or(body);
    let body = body.strip_suffix('`').unwrap_or(body);
    if body.is_empty() || body.contains('`') {
        return None;
    }
    let file = body.trim();
    if file.is_empty() {
        return None;
    }
    Some(file.to_string())
}

fn starts_with_whitespace(text: &str) -> bool {
    text.chars().next().is_some_and(char::is_whitespace)
}
