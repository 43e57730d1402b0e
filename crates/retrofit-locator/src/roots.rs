use std::ffi::OsString;
use std::path::{Path, PathBuf};

const NPX_CACHE_DIR: &str = "_npx";

/// npx cache roots that exist on disk, in probe order.
///
/// `npm_config_cache` wins over the platform default; missing roots are dropped.
pub fn npx_cache_roots_from<F>(env: F) -> Vec<PathBuf>
where
    F: Fn(&str) -> Option<OsString>,
{
    let mut candidates = Vec::new();
    if let Some(cache) =
        non_empty(env("npm_config_cache")).or_else(|| non_empty(env("NPM_CONFIG_CACHE")))
    {
        candidates.push(PathBuf::from(cache).join(NPX_CACHE_DIR));
    }
    if cfg!(windows) {
        if let Some(app_data) = non_empty(env("LOCALAPPDATA")) {
            candidates.push(PathBuf::from(app_data).join("npm-cache").join(NPX_CACHE_DIR));
        }
    }
    if let Some(home) = non_empty(env("HOME")).or_else(|| non_empty(env("USERPROFILE"))) {
        candidates.push(PathBuf::from(home).join(".npm").join(NPX_CACHE_DIR));
    }

    let mut roots: Vec<PathBuf> = Vec::new();
    for candidate in candidates {
        if candidate.is_dir() && !roots.contains(&candidate) {
            roots.push(candidate);
        }
    }
    roots
}

pub fn default_npx_cache_roots() -> Vec<PathBuf> {
    npx_cache_roots_from(|key| std::env::var_os(key))
}

/// Global prefix from the npm environment variables, if set.
pub fn global_prefix_from<F>(env: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<OsString>,
{
    non_empty(env("NPM_CONFIG_PREFIX"))
        .or_else(|| non_empty(env("npm_config_prefix")))
        .map(PathBuf::from)
}

/// Module directory of a global npm prefix.
pub fn global_module_dir(prefix: &Path) -> PathBuf {
    if cfg!(windows) {
        prefix.join("node_modules")
    } else {
        prefix.join("lib").join("node_modules")
    }
}

fn non_empty(value: Option<OsString>) -> Option<OsString> {
    value.filter(|value| !value.is_empty())
}
