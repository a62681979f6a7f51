//! # Traverse Command
//!
//! Plans a walk over every managed branch and prints what each one needs.
//! Executing the plan is left to the user.

use anyhow::Result;
use clap::Args;
use machete_core::{TraverseOptions, plan_traverse};

use super::CommandContext;
use crate::output::{OutputFormat, print_success, print_warning};
use crate::render::render_plan;

#[derive(Args)]
pub struct TraverseArgs {
  /// Do not suggest pushing to origin
  #[arg(long = "no-push")]
  pub no_push: bool,

  /// Do not suggest pulling from origin
  #[arg(long = "no-pull")]
  pub no_pull: bool,

  /// Output format
  #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
  pub format: OutputFormat,
}

impl TraverseArgs {
  fn options(&self, defaults: TraverseOptions) -> TraverseOptions {
    TraverseOptions {
      push: defaults.push && !self.no_push,
      pull: defaults.pull && !self.no_pull,
    }
  }
}

pub fn handle_traverse_command(context: &CommandContext, args: TraverseArgs) -> Result<()> {
  let snapshot = context.require_snapshot()?;
  let options = args.options(TraverseOptions::from(&context.config().traverse));

  let operation = snapshot.ongoing_repository_operation();
  if operation.is_in_progress() {
    print_warning(&format!("A {operation} is in progress; finish it before traversing."));
  }

  let steps = plan_traverse(&snapshot, options);
  match args.format {
    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&steps)?),
    OutputFormat::Text if steps.is_empty() => print_success("All branches are in sync."),
    OutputFormat::Text => println!("{}", render_plan(&steps)),
  }
  Ok(())
}
