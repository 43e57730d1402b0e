use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use retrofit_core::ScopeFilter;
use retrofit_engine::RepairSource;

mod command_flows;
mod completion;
mod dispatch;
mod logging;
mod render;

use completion::CliCompletionShell;
use render::ColorChoice;

#[derive(Parser, Debug)]
#[command(name = "retrofit", version)]
#[command(
    about = "Idempotent fixes for installed @claude-flow/cli packages",
    long_about = None
)]
pub(crate) struct Cli {
    /// Directory holding `patch/` and `retrofit.toml`
    #[arg(long, global = true, env = "RETROFIT_ROOT")]
    root: Option<PathBuf>,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,
    /// Options for the default `patch` run when no subcommand is given
    #[command(flatten)]
    patch: PatchArgs,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply every catalog patch to every discovered install (default)
    #[command(visible_alias = "patch-all")]
    Patch(PatchArgs),
    /// Apply a single patch by id
    Apply {
        id: String,
        #[command(flatten)]
        location: LocationArgs,
        /// Arguments forwarded to script patches
        #[arg(last = true)]
        extra: Vec<String>,
    },
    /// Verify sentinels without changing anything
    #[command(visible_alias = "check-patches")]
    Check(LocationArgs),
    /// Restore helper files missing from an initialised project
    #[command(visible_alias = "repair-post-init")]
    Repair {
        #[arg(long)]
        target: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = SourceArg::Auto)]
        source: SourceArg,
        #[arg(long)]
        dry_run: bool,
    },
    /// List catalog patches grouped by category
    List,
    /// Print a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: CliCompletionShell,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct LocationArgs {
    #[arg(long, value_enum, default_value_t = ScopeArg::Both)]
    scope: ScopeArg,
    /// Project directory searched for a local install
    #[arg(long)]
    target: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
struct PatchArgs {
    #[command(flatten)]
    location: LocationArgs,
    /// Only patches whose directory name matches this regex
    #[arg(long, env = "PATCH_INCLUDE")]
    include: Option<String>,
    /// Skip patches whose directory name matches this regex
    #[arg(long, env = "PATCH_EXCLUDE")]
    exclude: Option<String>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default, ValueEnum)]
enum ScopeArg {
    Local,
    Global,
    #[default]
    Both,
}

impl From<ScopeArg> for ScopeFilter {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::Local => ScopeFilter::Local,
            ScopeArg::Global => ScopeFilter::Global,
            ScopeArg::Both => ScopeFilter::Both,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default, ValueEnum)]
enum SourceArg {
    #[default]
    Auto,
    Local,
    Global,
}

impl From<SourceArg> for RepairSource {
    fn from(source: SourceArg) -> Self {
        match source {
            SourceArg::Auto => RepairSource::Auto,
            SourceArg::Local => RepairSource::Local,
            SourceArg::Global => RepairSource::Global,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match dispatch::run_cli(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
