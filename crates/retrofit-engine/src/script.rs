use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use retrofit_core::{InstallationRecord, OutcomeTally, RUVECTOR_PACKAGE, RUV_SWARM_PACKAGE};
use tracing::{debug, warn};

pub const SCRIPT_SHELL: &str = "sh";

const SOURCE_DIRS: [(&str, &str); 5] = [
    ("SERVICES", "services"),
    ("COMMANDS", "commands"),
    ("MEMORY", "memory"),
    ("INIT", "init"),
    ("MCP_TOOLS", "mcp-tools"),
];

const SOURCE_FILES: [(&str, &str); 11] = [
    ("HWE", "services/headless-worker-executor.js"),
    ("WD", "services/worker-daemon.js"),
    ("DJ", "commands/daemon.js"),
    ("DOC", "commands/doctor.js"),
    ("CLI_MEMORY", "commands/memory.js"),
    ("MI", "memory/memory-initializer.js"),
    ("EXECUTOR", "init/executor.js"),
    ("SETTINGS_GEN", "init/settings-generator.js"),
    ("MCP_MEMORY", "mcp-tools/memory-tools.js"),
    ("MCP_HOOKS", "mcp-tools/hooks-tools.js"),
    ("EMB_TOOLS", "mcp-tools/embeddings-tools.js"),
];

const RUVECTOR_CLI_REL: &str = "bin/cli.js";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptEnv {
    vars: Vec<(&'static str, String)>,
}

impl ScriptEnv {
    pub fn for_base(base: &Path) -> Self {
        let raw = base.to_string_lossy();
        let base = if raw == "/dev/null" {
            ""
        } else {
            raw.trim_end_matches('/')
        };

        let derive = |rel: &str| {
            if base.is_empty() {
                String::new()
            } else {
                format!("{base}/{rel}")
            }
        };

        let mut vars = vec![("BASE", base.to_string())];
        vars.extend(SOURCE_DIRS.iter().map(|(key, rel)| (*key, derive(rel))));
        vars.extend(SOURCE_FILES.iter().map(|(key, rel)| (*key, derive(rel))));
        Self { vars }
    }

    pub fn for_install(install: &InstallationRecord) -> Self {
        let companion = |name: &str, rel: Option<&str>| {
            install
                .companion_root(name)
                .map(|root| match rel {
                    Some(rel) => root.join(rel),
                    None => root.to_path_buf(),
                })
                .map(|path| path.to_string_lossy().into_owned())
                .unwrap_or_default()
        };

        let mut env = Self::for_base(&install.root_path);
        env.vars.push(("RUV_SWARM_ROOT", companion(RUV_SWARM_PACKAGE, None)));
        env.vars.push((
            "RUVECTOR_CLI",
            companion(RUVECTOR_PACKAGE, Some(RUVECTOR_CLI_REL)),
        ));
        env
    }

    pub fn vars(&self) -> &[(&'static str, String)] {
        &self.vars
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ScriptInvocation<'a> {
    pub script: &'a Path,
    pub env: &'a ScriptEnv,
    pub extra_args: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScriptOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

pub trait ScriptRunner {
    fn run(&self, invocation: &ScriptInvocation<'_>) -> Result<ScriptOutput>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ShellScriptRunner;

impl ScriptRunner for ShellScriptRunner {
    fn run(&self, invocation: &ScriptInvocation<'_>) -> Result<ScriptOutput> {
        let script = invocation.script;
        let output = build_script_command(invocation)
            .output()
            .with_context(|| format!("failed to spawn {SCRIPT_SHELL} for {}", script.display()))?;
        Ok(ScriptOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
        })
    }
}

pub fn build_script_command(invocation: &ScriptInvocation<'_>) -> Command {
    let mut command = Command::new(SCRIPT_SHELL);
    match (script_dir(invocation.script), invocation.script.file_name()) {
        (Some(dir), Some(file_name)) => {
            command.current_dir(dir).arg(file_name);
        }
        _ => {
            command.arg(invocation.script);
        }
    }
    command.args(invocation.extra_args);
    for (key, value) in invocation.env.vars() {
        command.env(key, value);
    }
    command
}

fn script_dir(script: &Path) -> Option<PathBuf> {
    script
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// Runs a script and folds its report into a tally. Never fails: a spawn
/// failure or non-zero exit is one warned outcome.
pub fn run_script(runner: &dyn ScriptRunner, invocation: &ScriptInvocation<'_>) -> OutcomeTally {
    match runner.run(invocation) {
        Ok(output) => {
            let mut tally = count_script_output(&output.stdout);
            if !output.success {
                warn!(
                    script = %invocation.script.display(),
                    stderr = %output.stderr.trim(),
                    "patch script exited with failure"
                );
                tally.warned += 1;
            }
            tally
        }
        Err(err) => {
            warn!("{err:#}");
            OutcomeTally {
                warned: 1,
                ..OutcomeTally::default()
            }
        }
    }
}

pub fn count_script_output(stdout: &str) -> OutcomeTally {
    let mut tally = OutcomeTally::default();
    for line in stdout.lines() {
        let line = line.trim_start();
        if line.starts_with("Applied:") {
            debug!("{line}");
            tally.applied += 1;
        } else if line.starts_with("Skipped:") {
            debug!("{line}");
            tally.skipped += 1;
        } else if line.starts_with("WARN:") || line.starts_with("ERROR:") {
            warn!("{line}");
            tally.warned += 1;
        }
    }
    tally
}
