//! Parameters handed to an external rebase executor.

use serde::Serialize;
use thiserror::Error;

use crate::branch::BranchName;
use crate::oracle::CommitHash;
use crate::snapshot::BranchRef;

/// Name of the hook git-machete runs before each rebase.
pub const PRE_REBASE_HOOK: &str = "machete-pre-rebase";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RebaseParametersError {
  /// Root branches have nothing to be rebased onto.
  #[error("branch '{branch}' has no upstream branch in the layout")]
  NoUpstream { branch: String },
  #[error("cannot determine the fork point of '{branch}'")]
  NoForkPoint { branch: String },
}

/// Everything needed to restack one branch onto its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitRebaseParameters {
  pub branch_to_rebase: BranchName,
  pub new_base_branch: BranchName,
  pub fork_point_commit: CommitHash,
  /// Tip of `branch_to_rebase` when the snapshot was taken.
  pub branch_commit: CommitHash,
  /// Tip of `new_base_branch` when the snapshot was taken.
  pub new_base_commit: CommitHash,
}

impl GitRebaseParameters {
  /// Arguments for `git rebase --onto <new-base> <fork-point> <branch>`.
  pub fn rebase_args(&self) -> Vec<String> {
    vec![
      "rebase".to_string(),
      "--onto".to_string(),
      self.new_base_branch.to_string(),
      self.fork_point_commit.to_string(),
      self.branch_to_rebase.to_string(),
    ]
  }

  /// Arguments for the pre-rebase hook: `<new-base> <fork-point> <branch>`.
  pub fn hook_args(&self) -> [String; 3] {
    [
      self.new_base_branch.to_string(),
      self.fork_point_commit.to_string(),
      self.branch_to_rebase.to_string(),
    ]
  }
}

/// Package the rebase of `branch` onto its declared parent.
///
/// Reads only data frozen in the snapshot and never touches the repository.
pub fn compute_rebase_parameters(branch: BranchRef<'_>) -> Result<GitRebaseParameters, RebaseParametersError> {
  let Some(parent) = branch.upstream() else {
    return Err(RebaseParametersError::NoUpstream {
      branch: branch.name.to_string(),
    });
  };
  let fork_point = branch
    .fork_point()
    .ok_or_else(|| RebaseParametersError::NoForkPoint {
      branch: branch.name.to_string(),
    })?;

  Ok(GitRebaseParameters {
    branch_to_rebase: branch.name.clone(),
    new_base_branch: parent.name.clone(),
    fork_point_commit: fork_point.clone(),
    branch_commit: branch.pointed_commit.hash.clone(),
    new_base_commit: parent.pointed_commit.hash.clone(),
  })
}
