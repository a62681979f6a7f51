//! # Layout Editing Commands
//!
//! `add`, `annotate` and `slide-out` rewrite the layout file. They never touch
//! branches, commits or the working tree.

use anyhow::{Context, Result};
use clap::Args;
use machete_core::{CommitGraphOracle, plan_slide_out};
use tracing::debug;

use super::CommandContext;
use crate::output::{format_branch, print_success};

#[derive(Args)]
pub struct AddArgs {
  /// Local branch to add
  pub branch: String,

  /// Parent branch (defaults to the current branch)
  #[arg(long, value_name = "BRANCH", conflicts_with = "as_root")]
  pub onto: Option<String>,

  /// Add the branch as a new root
  #[arg(long = "as-root")]
  pub as_root: bool,

  /// Annotation written after the branch name
  #[arg(long, value_name = "TEXT")]
  pub annotation: Option<String>,
}

#[derive(Args)]
pub struct AnnotateArgs {
  /// Branch to annotate
  pub branch: String,

  /// Annotation text; omit to clear
  #[arg(trailing_var_arg = true)]
  pub text: Vec<String>,
}

#[derive(Args)]
pub struct SlideOutArgs {
  /// Branches to remove from the layout, in order
  #[arg(required = true)]
  pub branches: Vec<String>,
}

pub fn handle_add_command(context: &CommandContext, args: AddArgs) -> Result<()> {
  let repository = context.require_repository()?;
  let oracle = repository.oracle();
  if oracle.pointed_commit(&args.branch)?.is_none() {
    anyhow::bail!("Branch '{}' does not exist", args.branch);
  }

  let layout = repository.read_layout()?;
  let parent = match args.onto {
    Some(onto) if !layout.contains(&onto) => {
      anyhow::bail!("Branch '{onto}' is not in the layout; add it first or use --as-root")
    }
    Some(onto) => Some(onto),
    None if args.as_root || layout.is_empty() => None,
    None => Some(
      oracle
        .current_branch_name()?
        .filter(|current| current != &args.branch)
        .context("Cannot infer the parent branch; use --onto or --as-root")?,
    ),
  };

  let updated = layout
    .with_entry_added(parent.as_deref(), &args.branch, args.annotation)
    .with_context(|| format!("Failed to add '{}' to the layout", args.branch))?;
  repository.write_layout(&updated)?;

  match parent {
    Some(parent) => print_success(&format!(
      "Added {} onto {}.",
      format_branch(&args.branch),
      format_branch(&parent)
    )),
    None => print_success(&format!("Added {} as a root branch.", format_branch(&args.branch))),
  }
  Ok(())
}

pub fn handle_annotate_command(context: &CommandContext, args: AnnotateArgs) -> Result<()> {
  let repository = context.require_repository()?;
  let annotation = Some(args.text.join(" ")).filter(|text| !text.trim().is_empty());

  let updated = repository
    .read_layout()?
    .with_annotation(&args.branch, annotation.clone())
    .with_context(|| format!("Failed to annotate '{}'", args.branch))?;
  repository.write_layout(&updated)?;

  match annotation {
    Some(text) => print_success(&format!("Annotated {}: {text}", format_branch(&args.branch))),
    None => print_success(&format!("Cleared the annotation of {}.", format_branch(&args.branch))),
  }
  Ok(())
}

pub fn handle_slide_out_command(context: &CommandContext, args: SlideOutArgs) -> Result<()> {
  let repository = context.require_repository()?;

  for branch in &args.branches {
    // Re-read statuses so each removal sees the layout left by the previous one.
    let snapshot = context.require_snapshot()?;
    let updated =
      plan_slide_out(&snapshot, branch).with_context(|| format!("Cannot slide out '{branch}'"))?;
    debug!(branch = branch.as_str(), "sliding out");
    repository.write_layout(&updated)?;
    print_success(&format!("Slid out {}.", format_branch(branch)));
  }
  Ok(())
}
