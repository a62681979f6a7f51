//! Text rendering of snapshots and traverse plans.
//!
//! Status output follows the git-machete look: each child hangs off a `|`
//! column and its edge letter tells the sync-to-parent status.
//!
//! ```text
//! develop
//! |
//! o-allow-ownership-link  PR #123 (ahead of origin)
//! | |
//! | x-build-chain (untracked)
//! |
//! m-call-ws
//! ```

use machete_core::{
  BranchRef, RepositorySnapshot, SuggestedAction, SyncToOriginStatus, SyncToParentStatus, TraverseStep,
};
use owo_colors::Style;

use crate::output::{format_branch, format_commit, paint};

#[derive(Debug, Clone, Copy, Default)]
pub struct StatusRenderOptions {
  /// List commits since the fork point above every branch.
  pub list_commits: bool,
}

fn edge(status: SyncToParentStatus) -> String {
  match status {
    SyncToParentStatus::InSync => paint("o", Style::new().green()),
    SyncToParentStatus::InSyncButForkPointOff => paint("?", Style::new().yellow()),
    SyncToParentStatus::Merged => paint("m", Style::new().dimmed()),
    SyncToParentStatus::OutOfSync => paint("x", Style::new().red()),
  }
}

fn branch_line(branch: BranchRef<'_>) -> String {
  let mut line = if branch.is_current() {
    format!("{} *", format_branch(branch.name.as_str()))
  } else {
    branch.name.to_string()
  };

  if let Some(annotation) = branch.custom_annotation.as_deref() {
    line.push_str("  ");
    line.push_str(&paint(annotation, Style::new().dimmed()));
  }
  if branch.sync_to_origin_status != SyncToOriginStatus::InSync {
    let origin = format!("({})", branch.sync_to_origin_status);
    line.push(' ');
    line.push_str(&paint(&origin, Style::new().red()));
  }
  line
}

fn render_children(out: &mut Vec<String>, branch: BranchRef<'_>, prefix: &str, options: StatusRenderOptions) {
  let children: Vec<_> = branch.children().collect();
  let count = children.len();

  for (index, child) in children.into_iter().enumerate() {
    out.push(format!("{prefix}|"));
    if options.list_commits {
      for commit in child.commits_since_fork_point().iter().rev() {
        out.push(format!("{prefix}| {} {}", format_commit(commit.hash.short()), commit.summary));
      }
    }
    out.push(format!("{prefix}{}-{}", edge(child.sync_to_parent_status()), branch_line(child)));

    let nested = if index + 1 == count {
      format!("{prefix}  ")
    } else {
      format!("{prefix}| ")
    };
    render_children(out, child, &nested, options);
  }
}

/// Render the managed forest, one root block per paragraph.
pub fn render_status(snapshot: &RepositorySnapshot, options: StatusRenderOptions) -> String {
  let mut blocks = Vec::new();
  for root in snapshot.root_branches() {
    let mut lines = vec![branch_line(root)];
    render_children(&mut lines, root, "", options);
    blocks.push(
      lines
        .iter()
        .map(|line| line.trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n"),
    );
  }
  blocks.join("\n\n")
}

fn describe_action(action: &SuggestedAction) -> String {
  match action {
    SuggestedAction::SlideOut => "slide out (merged into its parent)".to_string(),
    SuggestedAction::Rebase(params) => format!(
      "rebase onto {} (git {})",
      params.new_base_branch,
      params.rebase_args().join(" ")
    ),
    SuggestedAction::RebaseUnavailable { reason } => format!("needs a rebase, but {reason}"),
    SuggestedAction::Push { force: true } => "force-push to origin".to_string(),
    SuggestedAction::Push { force: false } => "push to origin".to_string(),
    SuggestedAction::Pull => "pull from origin".to_string(),
    SuggestedAction::ResolveDivergence => "resolve divergence from origin".to_string(),
  }
}

/// Render a traverse plan as a numbered list.
pub fn render_plan(steps: &[TraverseStep]) -> String {
  let mut lines = Vec::new();
  for (index, step) in steps.iter().enumerate() {
    lines.push(format!("{}. {}", index + 1, format_branch(step.branch.as_str())));
    for action in &step.actions {
      lines.push(format!("   - {}", describe_action(action)));
    }
  }
  lines.join("\n")
}
