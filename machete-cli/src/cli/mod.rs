//! # Command Line Interface
//!
//! Defines the CLI structure and dispatches to the command handlers. Commands
//! only read the repository; the ones that change anything write the layout
//! file and nothing else.

mod context;
mod edit;
mod fork_point;
mod rebase_params;
mod status;
mod traverse;

use std::path::PathBuf;

use anyhow::Result;
use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{ArgAction, Parser, Subcommand};

pub use context::CommandContext;

use crate::output::ColorMode;

/// Top-level CLI command for machete
#[derive(Parser)]
#[command(name = "machete")]
#[command(display_name = "🪓 Machete")]
#[command(about = "Sync status and restack plans for a declared branch layout")]
#[command(
  long_about = "Machete reads the branch layout declared in .git/machete (which branch is stacked on\n\
        which parent) and reports, for every branch, whether it is in sync with its parent\n\
        and with origin. It derives the rebase needed to restack a branch and plans a\n\
        traverse over the whole layout, without ever changing the repository itself."
)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
#[command(subcommand_required(true))]
#[command(disable_help_subcommand = true)]
#[command(max_term_width = 120)]
#[command(styles = Styles::styled()
    .header(AnsiColor::BrightGreen.on_default().bold().underline())
    .usage(AnsiColor::Green.on_default().bold())
    .literal(AnsiColor::BrightGreen.on_default().bold())
    .placeholder(AnsiColor::BrightWhite.on_default().italic())
    .valid(AnsiColor::Green.on_default())
    .invalid(AnsiColor::BrightRed.on_default().bold())
)]
pub struct Cli {
  /// Sets the level of verbosity (can be used multiple times)
  #[arg(
    short = 'v',
    long = "verbose",
    action = ArgAction::Count,
    global = true,
    long_help = "Sets the level of verbosity for tracing and logging output.\n\n\
             -v: Show info level messages\n\
             -vv: Show debug level messages\n\
             -vvv: Show trace level messages"
  )]
  pub verbose: u8,

  /// Controls when colored output is used
  #[arg(
    long,
    value_enum,
    ignore_case = true,
    global = true,
    default_value_t = ColorMode::Auto,
  )]
  pub colors: ColorMode,

  /// Path inside the repository to operate on
  #[arg(short = 'C', long = "repo", value_name = "PATH", global = true)]
  pub repo: Option<PathBuf>,

  /// Layout file to use instead of the configured or default one
  #[arg(long = "layout", value_name = "FILE", global = true)]
  pub layout: Option<PathBuf>,

  /// Subcommands
  #[command(subcommand)]
  pub command: Commands,
}

/// Subcommands for machete
#[derive(Subcommand)]
pub enum Commands {
  /// Add a branch to the layout
  #[command(long_about = "Add an existing local branch to the layout.\n\n\
            The branch is added as the last child of --onto, of the current branch when\n\
            --onto is not given, or as a new root with --as-root.")]
  Add(edit::AddArgs),

  /// Set or clear the annotation of a branch
  #[command(long_about = "Replace the annotation written after the branch name in the layout.\n\n\
            Annotations may carry the qualifiers rebase=no, push=no and slide-out=no, which\n\
            the traverse planner honours. Run without text to clear the annotation.")]
  #[command(alias = "anno")]
  Annotate(edit::AnnotateArgs),

  /// Show the fork point of a branch
  #[command(long_about = "Print the commit the branch was forked from.\n\n\
            The fork point is pinned by git config machete.overrideForkPoint.<branch>.to when\n\
            that commit is an ancestor of the branch, and is otherwise inferred from the\n\
            reflogs of the other local branches.")]
  #[command(name = "fork-point")]
  ForkPoint(fork_point::ForkPointArgs),

  /// Show the rebase that would restack a branch onto its parent
  #[command(name = "rebase-params")]
  RebaseParams(rebase_params::RebaseParamsArgs),

  /// Remove a branch from the layout, moving its children up
  #[command(name = "slide-out")]
  SlideOut(edit::SlideOutArgs),

  /// Show the layout with sync status of every branch
  #[command(long_about = "Display the branch layout with the status of every branch.\n\n\
            Edge letters: o in sync with parent, ? in sync but the fork point is not the\n\
            parent tip, x out of sync (needs a rebase), m merged into the parent.\n\
            The current branch is marked with *.")]
  #[command(alias = "s")]
  Status(status::StatusArgs),

  /// Plan a walk over all branches listing what each one needs
  #[command(alias = "t")]
  Traverse(traverse::TraverseArgs),
}

pub fn handle_cli(cli: Cli) -> Result<()> {
  cli.colors.apply();

  let context = CommandContext::load(cli.repo.as_deref(), cli.layout)?;
  match cli.command {
    Commands::Add(args) => edit::handle_add_command(&context, args),
    Commands::Annotate(args) => edit::handle_annotate_command(&context, args),
    Commands::ForkPoint(args) => fork_point::handle_fork_point_command(&context, args),
    Commands::RebaseParams(args) => rebase_params::handle_rebase_params_command(&context, args),
    Commands::SlideOut(args) => edit::handle_slide_out_command(&context, args),
    Commands::Status(args) => status::handle_status_command(&context, args),
    Commands::Traverse(args) => traverse::handle_traverse_command(&context, args),
  }
}
