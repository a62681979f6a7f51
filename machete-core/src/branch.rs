//! Managed branch model and the per-branch status computations.
//!
//! Branches live in an arena owned by [`crate::snapshot::RepositorySnapshot`]
//! and refer to each other through [`BranchId`]. Root and non-root branches
//! are the two cases of [`ManagedBranchKind`]; everything that only makes
//! sense below a parent (fork point, owned commits, sync-to-parent status) is
//! carried by the non-root payload.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use tracing::trace;

use crate::layout::BranchQualifiers;
use crate::oracle::{CommitGraphOracle, CommitHash, CommitRecord, OracleError, TrackingCounts};

/// Canonical branch name, cheap to clone.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BranchName(Arc<str>);

impl BranchName {
  pub fn new(name: impl Into<Arc<str>>) -> Self {
    Self(name.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for BranchName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("BranchName").field(&self.as_str()).finish()
  }
}

impl fmt::Display for BranchName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl Serialize for BranchName {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.as_str())
  }
}

impl From<&str> for BranchName {
  fn from(value: &str) -> Self {
    Self::new(Arc::<str>::from(value))
  }
}

impl From<String> for BranchName {
  fn from(value: String) -> Self {
    Self::new(Arc::<str>::from(value))
  }
}

impl Borrow<str> for BranchName {
  fn borrow(&self) -> &str {
    self.as_str()
  }
}

impl PartialEq<str> for BranchName {
  fn eq(&self, other: &str) -> bool {
    self.as_str() == other
  }
}

impl PartialEq<&str> for BranchName {
  fn eq(&self, other: &&str) -> bool {
    self.as_str() == *other
  }
}

/// Stable index of a branch inside one snapshot's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct BranchId(pub(crate) usize);

impl BranchId {
  pub const fn index(self) -> usize {
    self.0
  }
}

/// Relationship between a branch and its declared parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncToParentStatus {
  /// The parent tip is the branch's fork point.
  InSync,
  /// The branch descends from its parent, but was forked from elsewhere.
  InSyncButForkPointOff,
  /// The parent already contains the branch's commits.
  Merged,
  /// Histories diverged; the branch needs a rebase onto its parent.
  OutOfSync,
}

impl fmt::Display for SyncToParentStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      Self::InSync => "in sync",
      Self::InSyncButForkPointOff => "in sync, fork point off",
      Self::Merged => "merged",
      Self::OutOfSync => "out of sync",
    };
    f.write_str(label)
  }
}

/// Relationship between a branch and its remote counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncToOriginStatus {
  Untracked,
  Ahead,
  Behind,
  Diverged,
  InSync,
}

impl SyncToOriginStatus {
  /// Classify tracking counts. Divergence is checked before either single
  /// direction.
  pub const fn from_tracking(counts: Option<TrackingCounts>) -> Self {
    match counts {
      None => Self::Untracked,
      Some(TrackingCounts { ahead, behind }) if ahead > 0 && behind > 0 => Self::Diverged,
      Some(TrackingCounts { ahead, .. }) if ahead > 0 => Self::Ahead,
      Some(TrackingCounts { behind, .. }) if behind > 0 => Self::Behind,
      Some(_) => Self::InSync,
    }
  }
}

impl fmt::Display for SyncToOriginStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      Self::Untracked => "untracked",
      Self::Ahead => "ahead of origin",
      Self::Behind => "behind origin",
      Self::Diverged => "diverged from origin",
      Self::InSync => "in sync with origin",
    };
    f.write_str(label)
  }
}

/// Data that only exists for branches with a declared parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NonRootBranch {
  pub parent: BranchId,
  pub sync_to_parent_status: SyncToParentStatus,
  pub fork_point: Option<CommitHash>,
  /// Commits owned by the branch, most-recent-first.
  pub commits_since_fork_point: Vec<CommitRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ManagedBranchKind {
  Root,
  NonRoot(NonRootBranch),
}

/// Branch present both in the layout and in the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedBranch {
  pub name: BranchName,
  pub pointed_commit: CommitRecord,
  pub custom_annotation: Option<String>,
  pub qualifiers: BranchQualifiers,
  pub children: Vec<BranchId>,
  pub sync_to_origin_status: SyncToOriginStatus,
  #[serde(flatten)]
  pub kind: ManagedBranchKind,
}

impl ManagedBranch {
  pub const fn is_root(&self) -> bool {
    matches!(self.kind, ManagedBranchKind::Root)
  }

  pub const fn as_non_root(&self) -> Option<&NonRootBranch> {
    match &self.kind {
      ManagedBranchKind::Root => None,
      ManagedBranchKind::NonRoot(data) => Some(data),
    }
  }

  pub fn parent(&self) -> Option<BranchId> {
    self.as_non_root().map(|data| data.parent)
  }

  /// Roots are in sync with their (absent) parent by convention.
  pub fn sync_to_parent_status(&self) -> SyncToParentStatus {
    self
      .as_non_root()
      .map_or(SyncToParentStatus::InSync, |data| data.sync_to_parent_status)
  }

  pub fn fork_point(&self) -> Option<&CommitHash> {
    self.as_non_root().and_then(|data| data.fork_point.as_ref())
  }

  pub fn commits_since_fork_point(&self) -> &[CommitRecord] {
    self
      .as_non_root()
      .map(|data| data.commits_since_fork_point.as_slice())
      .unwrap_or_default()
  }
}

/// Classify a non-root branch against its parent.
///
/// `fork_point` is the branch's own fork point as reported by the oracle;
/// the caller already fetched it so it is not queried twice.
pub fn compute_sync_to_parent_status<O: CommitGraphOracle + ?Sized>(
  oracle: &O,
  branch: &str,
  branch_commit: &CommitHash,
  parent_commit: &CommitHash,
  fork_point: Option<&CommitHash>,
) -> Result<SyncToParentStatus, OracleError> {
  let status = if branch_commit == parent_commit {
    if oracle.has_just_been_created(branch)? {
      SyncToParentStatus::InSync
    } else {
      SyncToParentStatus::Merged
    }
  } else if oracle.is_ancestor(parent_commit, branch_commit)? {
    if fork_point == Some(parent_commit) {
      SyncToParentStatus::InSync
    } else {
      SyncToParentStatus::InSyncButForkPointOff
    }
  } else if oracle.is_ancestor(branch_commit, parent_commit)? {
    SyncToParentStatus::Merged
  } else {
    SyncToParentStatus::OutOfSync
  };

  trace!(branch, %status, "computed sync to parent");
  Ok(status)
}

pub fn compute_sync_to_origin_status<O: CommitGraphOracle + ?Sized>(
  oracle: &O,
  branch: &str,
) -> Result<SyncToOriginStatus, OracleError> {
  Ok(SyncToOriginStatus::from_tracking(oracle.tracking_status(branch)?))
}

/// Commits a rebase of this branch would replay. Empty without a fork point.
pub fn compute_commits_since_fork_point<O: CommitGraphOracle + ?Sized>(
  oracle: &O,
  branch: &str,
  fork_point: Option<&CommitHash>,
) -> Result<Vec<CommitRecord>, OracleError> {
  match fork_point {
    Some(fork_point) => oracle.commits_until(branch, fork_point),
    None => Ok(Vec::new()),
  }
}

#[cfg(test)]
mod tests {
  use test_case::test_case;

  use super::*;
  use crate::oracle::MemoryOracle;

  fn status(oracle: &MemoryOracle, parent: &str, child: &str) -> SyncToParentStatus {
    let parent_commit = oracle.pointed_commit(parent).unwrap().unwrap().hash;
    let child_commit = oracle.pointed_commit(child).unwrap().unwrap().hash;
    let fork_point = oracle.fork_point(child).unwrap();
    compute_sync_to_parent_status(oracle, child, &child_commit, &parent_commit, fork_point.as_ref()).unwrap()
  }

  #[test]
  fn branch_name_serializes_as_plain_string() {
    let names = vec![BranchName::from("main"), BranchName::from("feature/login")];
    assert_eq!(serde_json::to_string(&names).unwrap(), r#"["main","feature/login"]"#);
  }

  #[test]
  fn same_commit_and_just_created_is_in_sync() {
    let mut oracle = MemoryOracle::new();
    oracle
      .chain(&["x"])
      .branch("main", "x")
      .branch("topic", "x")
      .set_just_created("topic", true);

    assert_eq!(status(&oracle, "main", "topic"), SyncToParentStatus::InSync);
  }

  #[test]
  fn same_commit_and_pre_existing_is_merged() {
    let mut oracle = MemoryOracle::new();
    oracle.chain(&["x"]).branch("main", "x").branch("topic", "x");

    assert_eq!(status(&oracle, "main", "topic"), SyncToParentStatus::Merged);
  }

  #[test]
  fn descendant_forked_from_parent_tip_is_in_sync() {
    let mut oracle = MemoryOracle::new();
    oracle
      .chain(&["a", "b", "c"])
      .branch("main", "a")
      .branch("topic", "c")
      .set_fork_point("topic", Some("a"));

    assert_eq!(status(&oracle, "main", "topic"), SyncToParentStatus::InSync);
  }

  #[test_case(None ; "missing fork point")]
  #[test_case(Some("b") ; "fork point elsewhere")]
  fn descendant_with_drifted_fork_point(fork_point: Option<&str>) {
    let mut oracle = MemoryOracle::new();
    oracle
      .chain(&["a", "b", "c"])
      .branch("main", "a")
      .branch("topic", "c")
      .set_fork_point("topic", fork_point);

    assert_eq!(status(&oracle, "main", "topic"), SyncToParentStatus::InSyncButForkPointOff);
  }

  #[test]
  fn ancestor_of_parent_is_merged() {
    let mut oracle = MemoryOracle::new();
    oracle
      .chain(&["a", "b"])
      .branch("main", "b")
      .branch("topic", "a")
      .set_fork_point("topic", Some("a"));

    assert_eq!(status(&oracle, "main", "topic"), SyncToParentStatus::Merged);
  }

  #[test]
  fn unrelated_histories_are_out_of_sync() {
    let mut oracle = MemoryOracle::new();
    oracle
      .chain(&["a", "b"])
      .commit("c", &["a"])
      .branch("main", "b")
      .branch("topic", "c")
      .set_fork_point("topic", Some("a"));

    assert_eq!(status(&oracle, "main", "topic"), SyncToParentStatus::OutOfSync);
  }

  #[test_case(None => SyncToOriginStatus::Untracked ; "untracked")]
  #[test_case(Some(TrackingCounts::new(3, 2)) => SyncToOriginStatus::Diverged ; "diverged wins over ahead")]
  #[test_case(Some(TrackingCounts::new(3, 0)) => SyncToOriginStatus::Ahead ; "ahead")]
  #[test_case(Some(TrackingCounts::new(0, 2)) => SyncToOriginStatus::Behind ; "behind")]
  #[test_case(Some(TrackingCounts::new(0, 0)) => SyncToOriginStatus::InSync ; "in sync")]
  fn origin_status_from_tracking(counts: Option<TrackingCounts>) -> SyncToOriginStatus {
    let mut oracle = MemoryOracle::new();
    oracle.chain(&["a"]).branch("topic", "a").set_tracking("topic", counts);
    compute_sync_to_origin_status(&oracle, "topic").unwrap()
  }

  #[test]
  fn commits_since_fork_point_need_a_fork_point() {
    let mut oracle = MemoryOracle::new();
    oracle.chain(&["a", "b", "c"]).branch("topic", "c");

    assert!(compute_commits_since_fork_point(&oracle, "topic", None).unwrap().is_empty());

    let commits = compute_commits_since_fork_point(&oracle, "topic", Some(&"a".into())).unwrap();
    let hashes: Vec<_> = commits.iter().map(|commit| commit.hash.as_str()).collect();
    assert_eq!(hashes, vec!["c", "b"]);
  }

  #[test]
  fn root_accessors_fall_back_to_defaults() {
    let branch = ManagedBranch {
      name: "main".into(),
      pointed_commit: CommitRecord::new("a", "init"),
      custom_annotation: None,
      qualifiers: BranchQualifiers::default(),
      children: Vec::new(),
      sync_to_origin_status: SyncToOriginStatus::Untracked,
      kind: ManagedBranchKind::Root,
    };

    assert!(branch.is_root());
    assert_eq!(branch.sync_to_parent_status(), SyncToParentStatus::InSync);
    assert!(branch.fork_point().is_none());
    assert!(branch.commits_since_fork_point().is_empty());
    assert!(branch.parent().is_none());
  }
}
