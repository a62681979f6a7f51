//! # Rebase Parameters Command
//!
//! Prints the `git rebase --onto` invocation (and pre-rebase hook arguments)
//! that would restack a branch onto its parent. Nothing is executed.

use anyhow::{Context, Result};
use clap::Args;
use machete_core::PRE_REBASE_HOOK;

use super::CommandContext;
use crate::output::{OutputFormat, format_command};

#[derive(Args)]
pub struct RebaseParamsArgs {
  /// Branch to restack (defaults to the current branch)
  pub branch: Option<String>,

  /// Output format
  #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
  pub format: OutputFormat,
}

pub fn handle_rebase_params_command(context: &CommandContext, args: RebaseParamsArgs) -> Result<()> {
  let branch = context.branch_or_current(args.branch)?;
  let snapshot = context.require_snapshot()?;
  let managed = snapshot
    .branch_by_name(&branch)
    .with_context(|| format!("Branch '{branch}' is not managed by the layout"))?;
  let params = managed.rebase_parameters()?;

  match args.format {
    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&params)?),
    OutputFormat::Text => {
      println!("{}", format_command(&format!("git {}", params.rebase_args().join(" "))));
      println!("{PRE_REBASE_HOOK} {}", params.hook_args().join(" "));
    }
  }
  Ok(())
}
