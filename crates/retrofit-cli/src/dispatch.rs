use std::process::ExitCode;

use anyhow::Result;

use crate::command_flows::{
    run_apply_command, run_check_command, run_list_command, run_patch_command,
    run_repair_command, Workspace,
};
use crate::completion::write_completions_script;
use crate::render::{current_output_style, TerminalRenderer};
use crate::{Cli, Commands};

pub(crate) fn run_cli(cli: Cli) -> Result<ExitCode> {
    let renderer = TerminalRenderer::from_style(current_output_style(cli.color));
    let command = cli.command.unwrap_or(Commands::Patch(cli.patch));

    if let Commands::Completions { shell } = command {
        write_completions_script(shell, &mut std::io::stdout().lock())?;
        return Ok(ExitCode::SUCCESS);
    }

    let workspace = Workspace::open(cli.root)?;
    match command {
        Commands::Patch(args) => run_patch_command(&workspace, &args, renderer)?,
        Commands::Apply {
            id,
            location,
            extra,
        } => run_apply_command(&workspace, &id, &location, extra, renderer)?,
        Commands::Check(location) => {
            if !run_check_command(&workspace, &location, renderer)? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Repair {
            target,
            source,
            dry_run,
        } => run_repair_command(&workspace, target.as_deref(), source.into(), dry_run, renderer)?,
        Commands::List => run_list_command(&workspace, renderer)?,
        Commands::Completions { .. } => {}
    }
    Ok(ExitCode::SUCCESS)
}
