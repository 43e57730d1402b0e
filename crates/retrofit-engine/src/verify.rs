use std::fs;
use std::io;
use std::path::Path;

use retrofit_core::{SentinelRule, SentinelRuleSet, Verdict};
use tracing::debug;

pub fn verify(rule: &SentinelRule, base_dir: &Path) -> Verdict {
    let (pattern, file, want_present) = match rule {
        SentinelRule::None => return Verdict::Inapplicable,
        SentinelRule::Present { pattern, file } => (pattern, file, true),
        SentinelRule::Absent { pattern, file } => (pattern, file, false),
    };
    if !base_dir.is_dir() {
        return Verdict::Fail;
    }

    let path = base_dir.join(file);
    let found = match fs::read(&path) {
        Ok(content) => contains_bytes(&content, pattern.as_bytes()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return if want_present {
                Verdict::Fail
            } else {
                Verdict::Pass
            };
        }
        Err(err) => {
            debug!(path = %path.display(), "sentinel target unreadable: {err}");
            return Verdict::Fail;
        }
    };

    if found == want_present {
        Verdict::Pass
    } else {
        Verdict::Fail
    }
}

pub fn verify_set(set: &SentinelRuleSet, base_dir: &Path) -> Verdict {
    if !set.is_verifiable() {
        return Verdict::Inapplicable;
    }
    let failed = set
        .rules
        .iter()
        .any(|rule| verify(rule, base_dir) == Verdict::Fail);
    if failed {
        Verdict::Fail
    } else {
        Verdict::Pass
    }
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}
