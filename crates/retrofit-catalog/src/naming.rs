/// Pieces of a catalog directory name: `[NNN-]<PREFIX>-<NUMBER>-<slug>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DirName {
    pub order: Option<u32>,
    /// Directory name with the numeric order prefix removed.
    pub stripped: String,
    pub id: Option<String>,
    pub slug: String,
}

pub(crate) fn parse_dir_name(dir_name: &str) -> DirName {
    let (order, stripped) = split_order_prefix(dir_name);
    let id = id_from_stripped(stripped);
    let slug = match &id {
        Some(id) => stripped
            .strip_prefix(id.as_str())
            .and_then(|rest| rest.strip_prefix('-'))
            .unwrap_or("")
            .to_string(),
        None => stripped.to_string(),
    };

    DirName {
        order,
        stripped: stripped.to_string(),
        id,
        slug,
    }
}

fn split_order_prefix(dir_name: &str) -> (Option<u32>, &str) {
    let digits = dir_name
        .bytes()
        .take_while(|byte| byte.is_ascii_digit())
        .count();
    if digits == 0 {
        return (None, dir_name);
    }
    let Some(rest) = dir_name[digits..].strip_prefix('-') else {
        return (None, dir_name);
    };
    match dir_name[..digits].parse::<u32>() {
        Ok(order) => (Some(order), rest),
        Err(_) => (None, dir_name),
    }
}

fn id_from_stripped(stripped: &str) -> Option<String> {
    let mut tokens = stripped.splitn(3, '-');
    let prefix = tokens.next()?;
    let number = tokens.next()?;
    if !is_id_prefix(prefix) || number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    Some(format!("{prefix}-{number}"))
}

fn is_id_prefix(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_uppercase())
}

/// Category code of an id, e.g. `HW` for `HW-001`.
pub(crate) fn id_prefix(id: &str) -> &str {
    id.split('-').next().unwrap_or(id)
}
