use super::*;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

fn make_install(node_modules: &Path, rel: &str, version: Option<&str>) -> PathBuf {
    let package_dir = node_modules.join(rel);
    fs::create_dir_all(package_dir.join("dist/src")).expect("must create source tree");
    if let Some(version) = version {
        fs::write(
            package_dir.join("package.json"),
            format!("{{\"name\":\"@claude-flow/cli\",\"version\":\"{version}\"}}"),
        )
        .expect("must write manifest");
    }
    package_dir
}

fn env_from(pairs: &[(&str, &Path)]) -> impl Fn(&str) -> Option<OsString> {
    let owned = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.as_os_str().to_os_string()))
        .collect::<Vec<_>>();
    move |key| {
        owned
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.clone())
    }
}

fn local_installs(project_dir: &Path) -> Vec<InstallationRecord> {
    let ctx = LocatorContext::new(TargetSpec::default()).with_project_dir(project_dir);
    discover_installs(&ctx, ScopeFilter::Local)
}

fn make_companion(node_modules: &Path, name: &str) -> PathBuf {
    let dir = node_modules.join(name);
    fs::create_dir_all(&dir).expect("must create companion dir");
    fs::write(dir.join("package.json"), format!("{{\"name\":\"{name}\"}}"))
        .expect("must write companion manifest");
    dir
}

#[test]
fn discovers_direct_project_install() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    make_install(&tmp.path().join("node_modules"), "@claude-flow/cli", Some("3.1.0"));

    let installs = local_installs(tmp.path());
    assert_eq!(installs.len(), 1);
    let install = &installs[0];
    assert_eq!(install.scope, InstallScope::ProjectLocal);
    assert_eq!(install.layout, InstallLayout::Direct);
    assert_eq!(install.version, "3.1.0");
    assert!(install.root_path.ends_with("@claude-flow/cli/dist/src"));
    assert!(install.package_root.ends_with("@claude-flow/cli"));
    assert!(install.writable);
}

#[test]
fn discovers_nested_umbrella_install() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    make_install(
        &tmp.path().join("node_modules"),
        "claude-flow/v3/@claude-flow/cli",
        Some("3.0.2"),
    );

    let installs = local_installs(tmp.path());
    assert_eq!(installs.len(), 1);
    assert_eq!(installs[0].layout, InstallLayout::Nested);
    assert_eq!(installs[0].version, "3.0.2");
}

#[test]
fn direct_and_nested_installs_are_both_reported() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    let node_modules = tmp.path().join("node_modules");
    make_install(&node_modules, "@claude-flow/cli", Some("3.1.0"));
    make_install(
        &node_modules,
        "claude-flow/node_modules/@claude-flow/cli",
        Some("3.0.0"),
    );

    let installs = local_installs(tmp.path());
    let layouts = installs.iter().map(|install| install.layout).collect::<Vec<_>>();
    assert_eq!(layouts, vec![InstallLayout::Direct, InstallLayout::Nested]);
}

#[test]
fn package_without_source_tree_is_ignored() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    fs::create_dir_all(tmp.path().join("node_modules/@claude-flow/cli/dist"))
        .expect("must create partial tree");

    assert!(local_installs(tmp.path()).is_empty());
}

#[test]
fn missing_project_dir_yields_nothing() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    let missing = tmp.path().join("does-not-exist");
    assert!(local_installs(&missing).is_empty());
}

#[test]
fn version_falls_back_to_empty_when_manifest_is_missing_or_invalid() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    let node_modules = tmp.path().join("node_modules");
    make_install(&node_modules, "@claude-flow/cli", None);

    let installs = local_installs(tmp.path());
    assert_eq!(installs[0].version, "");
    assert_eq!(installs[0].display_version(), "unknown");

    let manifest = node_modules.join("@claude-flow/cli/package.json");
    fs::write(&manifest, "{ not json").expect("must write manifest");
    assert_eq!(read_declared_version(&manifest), "");

    fs::write(&manifest, "{\"version\": 3}").expect("must write manifest");
    assert_eq!(read_declared_version(&manifest), "");
}

#[test]
fn npx_hash_dirs_are_scanned_in_sorted_order() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    let npx = tmp.path().join("_npx");
    make_install(&npx.join("bbb222/node_modules"), "@claude-flow/cli", Some("3.0.1"));
    make_install(&npx.join("aaa111/node_modules"), "@claude-flow/cli", Some("3.0.0"));
    fs::create_dir_all(npx.join("ccc333/node_modules")).expect("must create empty hash dir");

    let ctx = LocatorContext::new(TargetSpec::default()).with_npx_cache_roots(vec![npx]);
    let installs = discover_installs(&ctx, ScopeFilter::Global);
    let versions = installs
        .iter()
        .map(|install| install.version.as_str())
        .collect::<Vec<_>>();
    assert_eq!(versions, vec!["3.0.0", "3.0.1"]);
    assert!(installs
        .iter()
        .all(|install| install.scope == InstallScope::UserGlobal));
}

#[test]
fn scope_filter_limits_discovery() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    let project = tmp.path().join("project");
    let prefix = tmp.path().join("prefix");
    make_install(&project.join("node_modules"), "@claude-flow/cli", Some("3.1.0"));
    make_install(&global_module_dir(&prefix), "@claude-flow/cli", Some("3.0.0"));

    let ctx = LocatorContext::new(TargetSpec::default())
        .with_project_dir(&project)
        .with_global_prefix(Some(prefix.as_path()));

    let local = discover_installs(&ctx, ScopeFilter::Local);
    assert_eq!(local.len(), 1);
    assert_eq!(local[0].scope, InstallScope::ProjectLocal);

    let global = discover_installs(&ctx, ScopeFilter::Global);
    assert_eq!(global.len(), 1);
    assert_eq!(global[0].scope, InstallScope::UserGlobal);

    let both = discover_installs(&ctx, ScopeFilter::Both);
    let scopes = both.iter().map(|install| install.scope).collect::<Vec<_>>();
    assert_eq!(
        scopes,
        vec![InstallScope::ProjectLocal, InstallScope::UserGlobal]
    );
}

#[test]
fn same_install_reached_twice_is_reported_once() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    let prefix = tmp.path().join("prefix");
    make_install(&global_module_dir(&prefix), "@claude-flow/cli", Some("3.0.0"));

    let ctx = LocatorContext::new(TargetSpec::default())
        .with_global_prefix(Some(prefix.as_path()))
        .with_global_prefix(Some(prefix.as_path()));
    assert_eq!(discover_installs(&ctx, ScopeFilter::Both).len(), 1);
}

#[cfg(unix)]
#[test]
fn symlinked_cache_root_is_deduplicated() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    let npx = tmp.path().join("_npx");
    make_install(&npx.join("abc/node_modules"), "@claude-flow/cli", Some("3.0.0"));
    let alias = tmp.path().join("alias_npx");
    std::os::unix::fs::symlink(&npx, &alias).expect("must create symlink");

    let ctx = LocatorContext::new(TargetSpec::default()).with_npx_cache_roots(vec![npx, alias]);
    assert_eq!(discover_installs(&ctx, ScopeFilter::Global).len(), 1);
}

#[test]
fn custom_target_coordinates_are_honoured() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    let target = TargetSpec {
        scope: String::new(),
        name: "tool".to_string(),
        src_subpath: "lib".to_string(),
        umbrella_paths: Vec::new(),
        ..TargetSpec::default()
    };
    fs::create_dir_all(tmp.path().join("node_modules/tool/lib")).expect("must create tree");

    let ctx = LocatorContext::new(target).with_project_dir(tmp.path());
    let installs = discover_installs(&ctx, ScopeFilter::Local);
    assert_eq!(installs.len(), 1);
    assert!(installs[0].root_path.ends_with("tool/lib"));
}

#[test]
fn npx_cache_roots_keep_existing_dirs_in_probe_order() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    let cache = tmp.path().join("cache");
    let home = tmp.path().join("home");
    fs::create_dir_all(cache.join("_npx")).expect("must create cache root");
    fs::create_dir_all(home.join(".npm/_npx")).expect("must create home root");

    let roots = npx_cache_roots_from(env_from(&[
        ("npm_config_cache", cache.as_path()),
        ("HOME", home.as_path()),
    ]));
    assert_eq!(roots, vec![cache.join("_npx"), home.join(".npm/_npx")]);
}

#[test]
fn npx_cache_roots_drop_missing_dirs() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    let roots = npx_cache_roots_from(env_from(&[("HOME", tmp.path())]));
    assert!(roots.is_empty());
    assert!(npx_cache_roots_from(|_| None).is_empty());
}

#[test]
fn global_prefix_prefers_upper_case_variable() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    let upper = tmp.path().join("upper");
    let lower = tmp.path().join("lower");
    assert_eq!(
        global_prefix_from(env_from(&[
            ("NPM_CONFIG_PREFIX", upper.as_path()),
            ("npm_config_prefix", lower.as_path()),
        ])),
        Some(upper)
    );
    assert_eq!(
        global_prefix_from(env_from(&[("npm_config_prefix", lower.as_path())])),
        Some(lower)
    );
    assert_eq!(global_prefix_from(|_| None), None);
}

#[cfg(unix)]
#[test]
fn global_module_dir_lives_under_lib() {
    assert_eq!(
        global_module_dir(Path::new("/usr/local")),
        PathBuf::from("/usr/local/lib/node_modules")
    );
}

#[test]
fn package_layout_lists_direct_candidate_first() {
    let layout = PackageLayout::new(TargetSpec::default());
    let candidates = layout.package_dir_candidates(Path::new("nm"));
    assert_eq!(candidates.len(), 3);
    assert_eq!(
        candidates[0],
        (InstallLayout::Direct, PathBuf::from("nm/@claude-flow/cli"))
    );
    assert_eq!(
        candidates[1],
        (
            InstallLayout::Nested,
            PathBuf::from("nm/claude-flow/v3/@claude-flow/cli")
        )
    );
    assert_eq!(
        layout.artifacts_dir(Path::new("pkg")),
        PathBuf::from("pkg/.claude/helpers")
    );
}

#[test]
fn companions_are_recorded_per_install_node_modules() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    let npx = tmp.path().join("_npx");
    let with_swarm = npx.join("aaa").join("node_modules");
    let bare = npx.join("bbb").join("node_modules");
    make_install(&with_swarm, "@claude-flow/cli", Some("3.1.0"));
    make_install(&bare, "@claude-flow/cli", Some("3.1.0"));
    let swarm_dir = make_companion(&with_swarm, "ruv-swarm");
    let ruvector_dir = make_companion(&with_swarm, "ruvector");
    fs::create_dir_all(bare.join("ruv-swarm")).expect("must create manifest-less dir");

    let ctx = LocatorContext::new(TargetSpec::default()).with_npx_cache_roots(vec![npx]);
    let installs = discover_installs(&ctx, ScopeFilter::Global);

    assert_eq!(installs.len(), 2);
    assert_eq!(
        installs[0].companion_root("ruv-swarm"),
        Some(fs::canonicalize(&swarm_dir).expect("canonical").as_path())
    );
    assert_eq!(
        installs[0].companion_root("ruvector"),
        Some(fs::canonicalize(&ruvector_dir).expect("canonical").as_path())
    );
    assert!(installs[1].companions.is_empty());
}

#[test]
fn companion_roots_ignore_unknown_packages() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    make_companion(tmp.path(), "left-pad");
    make_companion(tmp.path(), "ruvector");

    let roots = companion_roots(tmp.path());
    assert_eq!(roots.keys().collect::<Vec<_>>(), vec!["ruvector"]);
}
