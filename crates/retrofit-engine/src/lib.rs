mod check;
mod edit;
mod orchestrator;
mod repair;
mod script;
mod verify;

pub use check::{check_installs, CheckEntry, CheckReport, InstallCheck};
pub use edit::{apply, apply_all, apply_first, write_atomic};
pub use orchestrator::{InstallSummary, Orchestrator, RunEvent, RunSummary};
pub use repair::{repair, RepairReport, RepairSource};
pub use script::{
    build_script_command, count_script_output, run_script, ScriptEnv, ScriptInvocation,
    ScriptOutput, ScriptRunner, ShellScriptRunner, SCRIPT_SHELL,
};
pub use verify::{verify, verify_set};
