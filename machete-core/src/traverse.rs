//! Planning of `traverse` and `slide-out` from a snapshot.
//!
//! The planner only reads statuses already frozen in a
//! [`RepositorySnapshot`]; executing the plan is up to the caller.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::branch::{BranchId, BranchName, SyncToOriginStatus, SyncToParentStatus};
use crate::layout::{BranchLayout, LayoutEditError};
use crate::rebase::{GitRebaseParameters, RebaseParametersError};
use crate::snapshot::{BranchRef, RepositorySnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraverseOptions {
  /// Suggest pushing branches that are ahead of (or missing on) the remote.
  pub push: bool,
  /// Suggest pulling branches that are behind the remote.
  pub pull: bool,
}

impl Default for TraverseOptions {
  fn default() -> Self {
    Self { push: true, pull: true }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum SuggestedAction {
  /// Remove the merged branch from the layout, children move up.
  SlideOut,
  Rebase(GitRebaseParameters),
  /// The branch needs a rebase but the parameters cannot be derived.
  RebaseUnavailable { reason: String },
  /// Push to the remote; `force` after a planned rebase of a tracked branch.
  Push { force: bool },
  Pull,
  ResolveDivergence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraverseStep {
  pub branch: BranchName,
  pub actions: Vec<SuggestedAction>,
}

/// Walk managed branches depth-first and list what each one needs.
///
/// Branches needing nothing are omitted. Once a branch is planned to move
/// (rebase or slide-out) its children are planned for a rebase too, onto the
/// nearest ancestor that stays in the layout.
pub fn plan_traverse(snapshot: &RepositorySnapshot, options: TraverseOptions) -> Vec<TraverseStep> {
  let mut moving: HashSet<BranchId> = HashSet::new();
  let mut slid_out: HashSet<BranchId> = HashSet::new();
  let mut steps = Vec::new();

  for branch in snapshot.managed_branches() {
    let mut actions = Vec::new();
    let status = branch.sync_to_parent_status();

    if status == SyncToParentStatus::Merged && branch.qualifiers.slide_out {
      moving.insert(branch.id());
      slid_out.insert(branch.id());
      steps.push(TraverseStep {
        branch: branch.name.clone(),
        actions: vec![SuggestedAction::SlideOut],
      });
      continue;
    }

    let parent_moves = branch.upstream().is_some_and(|parent| moving.contains(&parent.id()));
    let needs_rebase = parent_moves
      || matches!(
        status,
        SyncToParentStatus::OutOfSync | SyncToParentStatus::InSyncButForkPointOff
      );

    let mut rebased = false;
    if needs_rebase && branch.qualifiers.rebase {
      match rebase_onto_surviving_parent(branch, &slid_out) {
        Ok(params) => {
          actions.push(SuggestedAction::Rebase(params));
          moving.insert(branch.id());
          rebased = true;
        }
        Err(err) => actions.push(SuggestedAction::RebaseUnavailable { reason: err.to_string() }),
      }
    }

    if let Some(action) = origin_action(branch.sync_to_origin_status, rebased, branch.qualifiers.push, options) {
      actions.push(action);
    }

    if !actions.is_empty() {
      steps.push(TraverseStep {
        branch: branch.name.clone(),
        actions,
      });
    }
  }

  debug!(steps = steps.len(), "planned traverse");
  steps
}

fn rebase_onto_surviving_parent(
  branch: BranchRef<'_>,
  slid_out: &HashSet<BranchId>,
) -> Result<GitRebaseParameters, RebaseParametersError> {
  let mut params = branch.rebase_parameters()?;

  let surviving = std::iter::successors(branch.upstream(), BranchRef::upstream)
    .find(|ancestor| !slid_out.contains(&ancestor.id()));
  if let Some(parent) = surviving {
    params.new_base_branch = parent.name.clone();
    params.new_base_commit = parent.pointed_commit.hash.clone();
  }
  Ok(params)
}

fn origin_action(
  status: SyncToOriginStatus,
  rebased: bool,
  push_allowed: bool,
  options: TraverseOptions,
) -> Option<SuggestedAction> {
  let push = push_allowed && options.push;
  match status {
    SyncToOriginStatus::Untracked if push => Some(SuggestedAction::Push { force: false }),
    SyncToOriginStatus::Untracked => None,
    _ if rebased => push.then_some(SuggestedAction::Push { force: true }),
    SyncToOriginStatus::Ahead if push => Some(SuggestedAction::Push { force: false }),
    SyncToOriginStatus::Behind if options.pull => Some(SuggestedAction::Pull),
    SyncToOriginStatus::Diverged => Some(SuggestedAction::ResolveDivergence),
    _ => None,
  }
}

/// Layout that results from sliding `name` out: its children take its place
/// under its parent.
///
/// Root branches cannot be slid out. Skipped entries can, which is how stale
/// names get cleaned up.
pub fn plan_slide_out(snapshot: &RepositorySnapshot, name: &str) -> Result<BranchLayout, LayoutEditError> {
  if let Some(branch) = snapshot.branch_by_name(name)
    && branch.is_root()
  {
    return Err(LayoutEditError::RootBranch(name.to_string()));
  }
  snapshot.branch_layout().with_entry_removed(name)
}
