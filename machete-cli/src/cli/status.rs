//! # Status Command
//!
//! Prints the managed forest with sync statuses, followed by warnings for
//! anything noteworthy found while building the snapshot.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use machete_core::{SnapshotEvent, SyncToParentStatus, collect_events, read_layout_file};
use serde_json::json;

use super::CommandContext;
use crate::output::{OutputFormat, format_branch, format_command, print_info, print_warning};
use crate::render::{StatusRenderOptions, render_status};

#[derive(Args)]
pub struct StatusArgs {
  /// List commits since the fork point of every branch
  #[arg(short = 'l', long = "list-commits")]
  pub list_commits: bool,

  /// Output format
  #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
  pub format: OutputFormat,

  /// Compare the layout in use against another layout file
  #[arg(long = "compare", value_name = "FILE")]
  pub compare: Option<PathBuf>,
}

pub fn handle_status_command(context: &CommandContext, args: StatusArgs) -> Result<()> {
  let Some(snapshot) = context.snapshot()? else {
    print_warning("Not in a git repository, nothing to show.");
    return Ok(());
  };

  let candidate = args
    .compare
    .as_deref()
    .map(read_layout_file)
    .transpose()
    .context("Failed to read layout to compare")?;
  let events = collect_events(&snapshot, candidate.as_ref());

  if args.format == OutputFormat::Json {
    let document = json!({ "snapshot": snapshot, "events": events });
    println!("{}", serde_json::to_string_pretty(&document)?);
    return Ok(());
  }

  if snapshot.is_empty() {
    print_info(&format!(
      "No managed branches. Add one with {}.",
      format_command("machete add <branch>")
    ));
  } else {
    println!(
      "{}",
      render_status(&snapshot, StatusRenderOptions {
        list_commits: args.list_commits,
      })
    );
  }

  let drifted: Vec<_> = snapshot
    .managed_branches()
    .filter(|branch| branch.sync_to_parent_status() == SyncToParentStatus::InSyncButForkPointOff)
    .map(|branch| format_branch(branch.name.as_str()))
    .collect();
  if !drifted.is_empty() {
    print_warning(&format!(
      "Fork point of {} is not the tip of its parent; inspect with {}.",
      drifted.join(", "),
      format_command("machete status --list-commits")
    ));
  }

  for event in events {
    match event {
      SnapshotEvent::BranchesSkipped { names } => print_warning(&format!(
        "Skipping {} which {} not exist locally; remove with {}.",
        names.join(", "),
        if names.len() == 1 { "does" } else { "do" },
        format_command("machete slide-out <branch>")
      )),
      SnapshotEvent::LayoutCandidateDiffers { .. } => {
        print_info("The compared layout differs from the one in use.");
      }
      SnapshotEvent::OperationInProgress { operation } => {
        print_warning(&format!("A {operation} is in progress in this repository."));
      }
    }
  }

  Ok(())
}
