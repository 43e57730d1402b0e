use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use retrofit_catalog::{Catalog, PatchFilter, OPS_FILE, SCRIPT_FILE};
use retrofit_core::{
    InstallationRecord, OutcomeTally, PatchDescriptor, ScopeFilter, ToolConfig, Verdict,
    CONFIG_FILE_NAME,
};
use retrofit_engine::{
    check_installs, repair, CheckReport, Orchestrator, RepairReport, RepairSource, RunEvent,
    RunSummary,
};
use retrofit_locator::{
    default_npx_cache_roots, discover_installs, global_prefix_from, LocatorContext,
};
use tracing::debug;

use crate::render::{render_status_line, render_warning_line, OutputStyle, TerminalRenderer};
use crate::{LocationArgs, PatchArgs};

pub(crate) const CATALOG_DIR: &str = "patch";

/// Tool root: the patch catalog directory plus optional configuration.
pub(crate) struct Workspace {
    root: PathBuf,
    config: ToolConfig,
}

impl Workspace {
    pub(crate) fn open(root: Option<PathBuf>) -> Result<Self> {
        let root = root.unwrap_or_else(|| PathBuf::from("."));
        let config = ToolConfig::load(&root.join(CONFIG_FILE_NAME))?;
        Ok(Self { root, config })
    }

    fn load_catalog(&self) -> Result<Catalog> {
        Catalog::load(self.root.join(CATALOG_DIR), &self.config)
    }
}

pub(crate) fn run_patch_command(
    workspace: &Workspace,
    args: &PatchArgs,
    renderer: TerminalRenderer,
) -> Result<()> {
    let filter = PatchFilter::new(args.include.as_deref(), args.exclude.as_deref())?;
    let catalog = workspace.load_catalog()?.filtered(&filter);
    let scope = ScopeFilter::from(args.location.scope);
    let ctx = build_locator_context(&workspace.config, args.location.target.as_deref(), scope)?;
    let installs = discover_installs(&ctx, scope);
    debug!(patches = catalog.len(), installs = installs.len(), "patch run");

    let orchestrator = Orchestrator::new(&workspace.config.target);
    execute_run(
        &workspace.config,
        &orchestrator,
        &catalog,
        &installs,
        scope,
        "patch",
        renderer,
    );
    Ok(())
}

pub(crate) fn run_apply_command(
    workspace: &Workspace,
    id: &str,
    location: &LocationArgs,
    extra: Vec<String>,
    renderer: TerminalRenderer,
) -> Result<()> {
    let catalog = workspace.load_catalog()?;
    let patch = catalog.find_by_id(id)?;
    if !patch.edit_kind.is_applicable() {
        return Err(anyhow!(
            "patch {} has neither {SCRIPT_FILE} nor {OPS_FILE}",
            patch.id
        ));
    }
    let single = Catalog::from_descriptors(catalog.root(), vec![patch.clone()]);

    let scope = ScopeFilter::from(location.scope);
    let ctx = build_locator_context(&workspace.config, location.target.as_deref(), scope)?;
    let installs = discover_installs(&ctx, scope);

    let orchestrator = Orchestrator::new(&workspace.config.target).extra_args(extra);
    execute_run(
        &workspace.config,
        &orchestrator,
        &single,
        &installs,
        scope,
        "apply",
        renderer,
    );
    Ok(())
}

/// Returns whether every checked patch passed or was inapplicable.
pub(crate) fn run_check_command(
    workspace: &Workspace,
    location: &LocationArgs,
    renderer: TerminalRenderer,
) -> Result<bool> {
    let catalog = workspace.load_catalog()?;
    let scope = ScopeFilter::from(location.scope);
    let ctx = build_locator_context(&workspace.config, location.target.as_deref(), scope)?;
    let installs = discover_installs(&ctx, scope);
    if installs.is_empty() {
        println!(
            "{}",
            render_warning_line(
                renderer.style(),
                &no_installs_message(&workspace.config, scope)
            )
        );
        return Ok(true);
    }

    let report = check_installs(&catalog, &installs, &workspace.config.target);
    renderer.print_section("check");
    renderer.print_lines(&format_check_lines(&report, renderer.style()));
    Ok(!report.has_failures())
}

pub(crate) fn run_repair_command(
    workspace: &Workspace,
    target: Option<&Path>,
    source: RepairSource,
    dry_run: bool,
    renderer: TerminalRenderer,
) -> Result<()> {
    let scope = match source {
        RepairSource::Local => ScopeFilter::Local,
        RepairSource::Global => ScopeFilter::Global,
        RepairSource::Auto => ScopeFilter::Both,
    };
    let ctx = build_locator_context(&workspace.config, target, scope)?;
    let report = repair(&ctx, source, dry_run)?;
    renderer.print_section("repair");
    renderer.print_lines(&format_repair_lines(&report, renderer.style()));
    Ok(())
}

pub(crate) fn run_list_command(
    workspace: &Workspace,
    renderer: TerminalRenderer,
) -> Result<()> {
    let catalog = workspace.load_catalog()?;
    renderer.print_lines(&format_list_lines(&catalog));
    Ok(())
}

fn execute_run(
    config: &ToolConfig,
    orchestrator: &Orchestrator<'_>,
    catalog: &Catalog,
    installs: &[InstallationRecord],
    scope: ScopeFilter,
    label: &str,
    renderer: TerminalRenderer,
) {
    let style = renderer.style();
    if installs.is_empty() {
        println!("{}", render_warning_line(style, &no_installs_message(config, scope)));
        println!("{}", OutcomeTally::default().summary_line());
        return;
    }

    renderer.print_section(label);
    renderer.print_lines(&format_install_lines(installs, style));

    let applicable = catalog
        .patches()
        .iter()
        .filter(|patch| patch.edit_kind.is_applicable())
        .count();
    let mut progress = renderer.start_progress(label, (installs.len() * applicable) as u64);
    let mut notes = Vec::new();
    let summary = orchestrator.run_with_observer(catalog, installs, scope, |event| match event {
        RunEvent::PatchFinished { .. } => progress.advance(),
        RunEvent::InstallWarning { install, message } => notes.push(render_warning_line(
            style,
            &format!("{}: {message}", install.root_path.display()),
        )),
        RunEvent::OperationWarned {
            patch,
            label: op_label,
            message,
            ..
        } => notes.push(render_warning_line(
            style,
            &format!("{}: {op_label}: {message}", patch.id),
        )),
        RunEvent::InstallStarted { .. } => {}
    });
    progress.finish_success();

    renderer.print_lines(&notes);
    renderer.print_lines(&format_run_summary_lines(&summary, style));
}

fn no_installs_message(config: &ToolConfig, scope: ScopeFilter) -> String {
    format!(
        "no {} installation found (scope: {})",
        config.target.package_name(),
        scope.as_str()
    )
}

/// Search roots for one invocation. Global roots are probed only when the
/// scope asks for them, so local runs never spawn `npm`.
pub(crate) fn build_locator_context(
    config: &ToolConfig,
    target: Option<&Path>,
    scope: ScopeFilter,
) -> Result<LocatorContext> {
    let project_dir = resolve_project_dir(target)?;
    let mut ctx = LocatorContext::new(config.target.clone()).with_project_dir(project_dir);
    if scope.wants_global() {
        let prefix = global_prefix_from(|key| std::env::var_os(key)).or_else(probe_npm_prefix);
        ctx = ctx
            .with_npx_cache_roots(default_npx_cache_roots())
            .with_global_prefix(prefix.as_deref());
    }
    Ok(ctx)
}

pub(crate) fn resolve_project_dir(target: Option<&Path>) -> Result<PathBuf> {
    match target {
        Some(dir) if dir.is_dir() => Ok(dir.to_path_buf()),
        Some(dir) => Err(anyhow!("target directory not found: {}", dir.display())),
        None => std::env::current_dir().context("failed to determine current directory"),
    }
}

pub(crate) fn build_npm_prefix_command() -> Command {
    let program = if cfg!(windows) { "npm.cmd" } else { "npm" };
    let mut command = Command::new(program);
    command.arg("config").arg("get").arg("prefix");
    command
}

fn probe_npm_prefix() -> Option<PathBuf> {
    let output = match build_npm_prefix_command().output() {
        Ok(output) => output,
        Err(err) => {
            debug!("npm prefix probe unavailable: {err}");
            return None;
        }
    };
    if !output.status.success() {
        debug!(status = %output.status, "npm prefix probe failed");
        return None;
    }
    let prefix = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if prefix.is_empty() {
        None
    } else {
        Some(PathBuf::from(prefix))
    }
}

pub(crate) fn format_install_lines(
    installs: &[InstallationRecord],
    style: OutputStyle,
) -> Vec<String> {
    installs
        .iter()
        .map(|install| {
            render_status_line(
                style,
                "step",
                &format!(
                    "found {} install {} ({}) at {}",
                    install.scope.as_str(),
                    install.display_version(),
                    install.layout.as_str(),
                    install.root_path.display()
                ),
            )
        })
        .collect()
}

pub(crate) fn format_run_summary_lines(summary: &RunSummary, style: OutputStyle) -> Vec<String> {
    let mut lines = summary
        .per_install
        .iter()
        .map(|install| {
            let status = if install.tally.warned > 0 { "warn" } else { "ok" };
            let version = if install.version.is_empty() {
                "unknown"
            } else {
                install.version.as_str()
            };
            render_status_line(
                style,
                status,
                &format!(
                    "{} {} [{}]: {}",
                    install.scope.as_str(),
                    version,
                    install.root_path.display(),
                    install.tally.summary_line()
                ),
            )
        })
        .collect::<Vec<_>>();
    lines.push(summary.summary_line());
    lines
}

pub(crate) fn format_check_lines(report: &CheckReport, style: OutputStyle) -> Vec<String> {
    let mut lines = Vec::new();
    for install in &report.installs {
        lines.push(format!(
            "{} ({})",
            install.install.root_path.display(),
            install.install.display_version()
        ));
        for entry in &install.entries {
            let message = format!("{}: {}", entry.patch_id, entry.title);
            lines.push(match style {
                OutputStyle::Plain => format!("  {:<4} {message}", entry.verdict.as_str()),
                OutputStyle::Rich => format!(
                    "  {}",
                    render_status_line(style, verdict_status(entry.verdict), &message)
                ),
            });
        }
    }
    lines.push(format!(
        "pass={} fail={} n/a={}",
        report.count(Verdict::Pass),
        report.count(Verdict::Fail),
        report.count(Verdict::Inapplicable)
    ));
    lines
}

fn verdict_status(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Pass => "ok",
        Verdict::Fail => "err",
        Verdict::Inapplicable => "step",
    }
}

pub(crate) fn format_repair_lines(report: &RepairReport, style: OutputStyle) -> Vec<String> {
    let mut lines = vec![
        format!("source: {}", report.source_dir.display()),
        format!("target: {}", report.target_dir.display()),
    ];
    let verb = if report.dry_run { "would copy" } else { "copied" };
    for name in &report.copied {
        lines.push(render_status_line(style, "ok", &format!("{verb} {name}")));
    }
    for name in &report.already_present {
        lines.push(render_status_line(style, "step", &format!("kept {name}")));
    }
    lines.push(format!(
        "copied={} kept={}{}",
        report.copied.len(),
        report.already_present.len(),
        if report.dry_run { " (dry run)" } else { "" }
    ));
    lines
}

pub(crate) fn format_list_lines(catalog: &Catalog) -> Vec<String> {
    let mut groups: BTreeMap<&str, Vec<&PatchDescriptor>> = BTreeMap::new();
    for patch in catalog.patches() {
        groups.entry(patch.prefix.as_str()).or_default().push(patch);
    }

    let mut lines = Vec::new();
    for (prefix, patches) in groups {
        let category = patches
            .first()
            .map(|patch| patch.category.as_str())
            .unwrap_or(prefix);
        lines.push(format!("{category} ({prefix})"));
        for patch in patches {
            let ops = patch.operation_count();
            lines.push(format!(
                "  {:<8} {:<9} {:<8} {} ({ops} op{})",
                patch.id,
                patch.severity,
                patch.edit_kind.as_str(),
                patch.title,
                if ops == 1 { "" } else { "s" }
            ));
        }
    }
    lines.push(format!("{} patches", catalog.len()));
    lines
}
