use anyhow::{Context, Result};
use clap::Args;
use machete_core::CommitGraphOracle;

use super::CommandContext;

#[derive(Args)]
pub struct ForkPointArgs {
  /// Branch to inspect (defaults to the current branch)
  pub branch: Option<String>,
}

pub fn handle_fork_point_command(context: &CommandContext, args: ForkPointArgs) -> Result<()> {
  let branch = context.branch_or_current(args.branch)?;
  let oracle = context.require_repository()?.oracle();

  if oracle.pointed_commit(&branch)?.is_none() {
    anyhow::bail!("Branch '{branch}' does not exist");
  }
  let fork_point = oracle
    .fork_point(&branch)?
    .with_context(|| format!("Cannot determine the fork point of '{branch}'"))?;

  println!("{fork_point}");
  Ok(())
}
