use super::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

fn sample_record(version: &str) -> InstallationRecord {
    InstallationRecord {
        root_path: PathBuf::from("/tmp/nm/@claude-flow/cli/dist/src"),
        package_root: PathBuf::from("/tmp/nm/@claude-flow/cli"),
        version: version.to_string(),
        scope: InstallScope::UserGlobal,
        layout: InstallLayout::Direct,
        writable: true,
        companions: BTreeMap::new(),
    }
}

#[test]
fn scope_filter_defaults_to_both() {
    assert_eq!(ScopeFilter::default(), ScopeFilter::Both);
    assert_eq!(ScopeFilter::default().as_str(), "both");
}

#[test]
fn scope_filter_includes_matching_scopes_only() {
    assert!(ScopeFilter::Local.includes(InstallScope::ProjectLocal));
    assert!(!ScopeFilter::Local.includes(InstallScope::UserGlobal));
    assert!(ScopeFilter::Global.includes(InstallScope::UserGlobal));
    assert!(!ScopeFilter::Global.wants_local());
    assert!(ScopeFilter::Both.wants_local() && ScopeFilter::Both.wants_global());
}

#[test]
fn display_version_reports_unknown_for_empty() {
    assert_eq!(sample_record("").display_version(), "unknown");
    assert_eq!(sample_record("3.1.0").display_version(), "3.1.0");
}

#[test]
fn base_for_resolves_tracked_and_companion_packages() {
    let mut record = sample_record("3.1.0");
    record.companions.insert(
        RUV_SWARM_PACKAGE.to_string(),
        PathBuf::from("/tmp/nm/ruv-swarm"),
    );

    assert_eq!(
        record.base_for(None, "@claude-flow/cli"),
        Some(Path::new("/tmp/nm/@claude-flow/cli/dist/src"))
    );
    assert_eq!(
        record.base_for(Some("@claude-flow/cli"), "@claude-flow/cli"),
        Some(record.root_path.as_path())
    );
    assert_eq!(
        record.base_for(Some(RUV_SWARM_PACKAGE), "@claude-flow/cli"),
        Some(Path::new("/tmp/nm/ruv-swarm"))
    );
    assert_eq!(record.base_for(Some(RUVECTOR_PACKAGE), "@claude-flow/cli"), None);
}

#[test]
fn edit_mode_parse_accepts_aliases() {
    assert_eq!(EditMode::parse("first"), Some(EditMode::First));
    assert_eq!(EditMode::parse("all-occurrences"), Some(EditMode::All));
    assert_eq!(EditMode::parse("some"), None);
}

#[test]
fn sentinel_set_with_none_rule_is_not_verifiable() {
    let set = SentinelRuleSet {
        package: None,
        rules: vec![
            SentinelRule::Present {
                pattern: "x".to_string(),
                file: "a.js".to_string(),
            },
            SentinelRule::None,
        ],
    };
    assert!(!set.is_verifiable());
    assert!(!SentinelRuleSet::default().is_verifiable());
}

#[test]
fn outcome_tally_counts_unreachable_separately() {
    let mut tally = OutcomeTally::default();
    tally.record(EditOutcome::Applied);
    tally.record(EditOutcome::AlreadyApplied);
    tally.record(EditOutcome::Drifted);
    tally.record(EditOutcome::Unreachable);
    assert_eq!(tally.summary_line(), "applied=1 skipped=1 warned=1");
    assert_eq!(tally.unreachable, 1);

    let mut total = OutcomeTally::default();
    total += tally;
    total += tally;
    assert_eq!(total.applied, 2);
    assert_eq!(total.warned, 2);
}

#[test]
fn default_config_targets_claude_flow_cli() {
    let config = ToolConfig::default();
    assert_eq!(config.target.package_name(), "@claude-flow/cli");
    assert_eq!(
        config.target.package_rel_path(),
        Path::new("@claude-flow").join("cli")
    );
    assert_eq!(config.category_label("HW"), "Headless Worker");
    assert_eq!(config.category_label("ZZ"), "ZZ");
}

#[test]
fn config_from_toml_overrides_target_and_keeps_defaults() {
    let config = ToolConfig::from_toml_str(
        r#"
[target]
scope = "@acme"
name = "tool"
supported = ">=2.0.0"

[categories]
AC = "Acme"
"#,
    )
    .expect("must parse");
    assert_eq!(config.target.package_name(), "@acme/tool");
    assert_eq!(config.target.src_subpath, "dist/src");
    assert_eq!(config.category_label("AC"), "Acme");
    assert!(config.target.supported.is_some());
}

#[test]
fn config_rejects_parent_components_in_subpaths() {
    let err = ToolConfig::from_toml_str("[target]\nsrc_subpath = \"../escape\"\n")
        .expect_err("must reject traversal");
    assert!(err.to_string().contains("src_subpath"), "unexpected: {err}");
}

#[test]
fn config_rejects_unscoped_scope_value() {
    let err = ToolConfig::from_toml_str("[target]\nscope = \"acme\"\n")
        .expect_err("must reject scope without @");
    assert!(err.to_string().contains("must start with '@'"));
}

#[test]
fn config_load_falls_back_to_defaults_when_missing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = ToolConfig::load(&dir.path().join(CONFIG_FILE_NAME)).expect("must load");
    assert_eq!(config, ToolConfig::default());
}

#[test]
fn config_load_reports_malformed_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "[target\n").expect("write");
    let err = ToolConfig::load(&path).expect_err("must fail");
    assert!(format!("{err:#}").contains("invalid config"));
}

#[test]
fn version_support_classifies_versions() {
    let mut target = TargetSpec::default();
    assert_eq!(
        target.version_support("3.1.0"),
        VersionSupport::Unconstrained
    );

    target.supported = Some(semver::VersionReq::parse(">=3.0.0").expect("req"));
    assert_eq!(target.version_support("3.1.0"), VersionSupport::Supported);
    assert_eq!(target.version_support(""), VersionSupport::Unknown);
    assert_eq!(target.version_support("not-semver"), VersionSupport::Unknown);
    assert_eq!(
        target.version_support("2.9.9"),
        VersionSupport::Unsupported {
            requirement: ">=3.0.0".to_string()
        }
    );
}

#[test]
fn operation_count_prefers_parsed_operations() {
    let op = EditOperation {
        label: "a".to_string(),
        target_file: "x.js".to_string(),
        anchor: "old".to_string(),
        replacement: "new".to_string(),
        mode: EditMode::First,
    };
    let mut descriptor = PatchDescriptor {
        id: "HW-001".to_string(),
        order: None,
        dir_name: "HW-001-stdin-hang".to_string(),
        slug: "stdin-hang".to_string(),
        prefix: "HW".to_string(),
        category: "Headless Worker".to_string(),
        title: String::new(),
        severity: "Unknown".to_string(),
        issue_label: String::new(),
        issue_url: String::new(),
        target_files: Vec::new(),
        declared_ops: 5,
        edit_kind: EditKind::Textual(vec![op]),
        sentinels: SentinelRuleSet::default(),
    };
    assert_eq!(descriptor.operation_count(), 1);
    descriptor.edit_kind = EditKind::Unknown;
    assert_eq!(descriptor.operation_count(), 5);
    assert!(!descriptor.edit_kind.is_applicable());
}
