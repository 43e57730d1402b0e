//! Grammar for a patch directory's `sentinel` file.
//!
//! One rule per line: `package: <name>`, `present "<pattern>" <file>`,
//! `absent "<pattern>" <file>` or `none`. `grep` is accepted as an older
//! spelling of `present`. Blank and unrecognised lines are ignored.

use retrofit_core::{SentinelRule, SentinelRuleSet};

const PACKAGE_KEY: &str = "package:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SentinelLine {
    Package(String),
    Rule(SentinelRule),
}

pub(crate) fn parse_sentinels(text: &str) -> SentinelRuleSet {
    let mut set = SentinelRuleSet::default();
    for line in text.lines() {
        match parse_sentinel_line(line) {
            Some(SentinelLine::Package(name)) => set.package = Some(name),
            Some(SentinelLine::Rule(rule)) => set.rules.push(rule),
            None => {}
        }
    }
    set
}

pub(crate) fn parse_sentinel_line(line: &str) -> Option<SentinelLine> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(name) = trimmed.strip_prefix(PACKAGE_KEY) {
        let name = name.trim();
        return (!name.is_empty()).then(|| SentinelLine::Package(name.to_string()));
    }

    if trimmed == "none" {
        return Some(SentinelLine::Rule(SentinelRule::None));
    }

    let (keyword, rest) = trimmed.split_once(char::is_whitespace)?;
    let (pattern, file) = parse_pattern_and_file(rest.trim_start())?;
    let rule = match keyword {
        "present" | "grep" => SentinelRule::Present { pattern, file },
        "absent" => SentinelRule::Absent { pattern, file },
        _ => return None,
    };
    Some(SentinelLine::Rule(rule))
}

fn parse_pattern_and_file(input: &str) -> Option<(String, String)> {
    let (pattern, consumed) = parse_quoted(input)?;
    let rest = &input[consumed..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let file = rest.trim();
    if pattern.is_empty() || file.is_empty() {
        return None;
    }
    Some((pattern, file.to_string()))
}

/// Parses a leading double-quoted string. Returns the unescaped value and the
/// number of bytes consumed, closing quote included.
pub(crate) fn parse_quoted(input: &str) -> Option<(String, usize)> {
    let body = input.strip_prefix('"')?;
    let mut value = String::new();
    let mut chars = body.char_indices();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '"' => return Some((value, idx + 2)),
            '\\' => match chars.next() {
                Some((_, escaped @ ('"' | '\\'))) => value.push(escaped),
                Some((_, other)) => {
                    value.push('\\');
                    value.push(other);
                }
                None => return None,
            },
            other => value.push(other),
        }
    }
    None
}
