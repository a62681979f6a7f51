//! Point-in-time view combining a [`BranchLayout`] with a live repository.
//!
//! [`SnapshotBuilder`] walks the layout once, asks the oracle everything it
//! needs and freezes the answers into a [`RepositorySnapshot`]. Nothing on the
//! snapshot talks to the repository again: a refresh means building a new
//! snapshot and dropping the old one.

use std::collections::HashMap;
use std::ops::Deref;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::branch::{
  BranchId, BranchName, ManagedBranch, ManagedBranchKind, NonRootBranch, compute_commits_since_fork_point,
  compute_sync_to_origin_status, compute_sync_to_parent_status,
};
use crate::layout::io::LayoutFileError;
use crate::layout::{BranchLayout, BranchLayoutEntry};
use crate::oracle::{CommitGraphOracle, OngoingRepositoryOperation, OracleError};
use crate::rebase::{GitRebaseParameters, RebaseParametersError, compute_rebase_parameters};

/// Errors produced while building a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
  /// The oracle could not answer a required query; no partial snapshot is
  /// produced.
  #[error("failed to read repository state")]
  OracleUnavailable(#[from] OracleError),
  /// The persisted layout could not be loaded.
  #[error(transparent)]
  Layout(#[from] LayoutFileError),
}

/// Immutable result of combining a layout with the repository.
///
/// The value owns every answer it exposes, so it can be cloned, shared across
/// threads and read concurrently without synchronisation. "No repository" is
/// expressed by callers as `Option<RepositorySnapshot>`.
#[derive(Debug, Clone, Serialize)]
pub struct RepositorySnapshot {
  branches: Vec<ManagedBranch>,
  root_branches: Vec<BranchId>,
  #[serde(skip)]
  by_name: HashMap<BranchName, BranchId>,
  current_branch: Option<BranchId>,
  skipped_branch_names: Vec<String>,
  #[serde(skip)]
  branch_layout: BranchLayout,
  ongoing_repository_operation: OngoingRepositoryOperation,
}

impl RepositorySnapshot {
  /// Number of managed branches.
  pub fn len(&self) -> usize {
    self.branches.len()
  }

  pub fn is_empty(&self) -> bool {
    self.branches.is_empty()
  }

  pub fn root_branches(&self) -> impl Iterator<Item = BranchRef<'_>> + '_ {
    self.root_branches.iter().map(|id| self.branch(*id))
  }

  /// Every managed branch, depth-first in layout order.
  pub fn managed_branches(&self) -> impl Iterator<Item = BranchRef<'_>> + '_ {
    // Ids are assigned in depth-first visiting order.
    (0..self.branches.len()).map(|index| self.branch(BranchId(index)))
  }

  /// Resolve an id handed out by this snapshot.
  ///
  /// Ids are only meaningful for the snapshot that produced them; indexing
  /// with a foreign id panics.
  pub fn branch(&self, id: BranchId) -> BranchRef<'_> {
    BranchRef { snapshot: self, id }
  }

  pub fn branch_by_name(&self, name: &str) -> Option<BranchRef<'_>> {
    self.by_name.get(name).map(|id| self.branch(*id))
  }

  pub fn current_branch_if_managed(&self) -> Option<BranchRef<'_>> {
    self.current_branch.map(|id| self.branch(id))
  }

  /// Layout entries without a live branch, in layout order.
  pub fn skipped_branch_names(&self) -> &[String] {
    &self.skipped_branch_names
  }

  /// The layout the snapshot was built from, kept for write-back.
  pub fn branch_layout(&self) -> &BranchLayout {
    &self.branch_layout
  }

  pub const fn ongoing_repository_operation(&self) -> OngoingRepositoryOperation {
    self.ongoing_repository_operation
  }
}

/// Borrowed handle to one branch of a snapshot, able to navigate the forest.
#[derive(Debug, Clone, Copy)]
pub struct BranchRef<'a> {
  snapshot: &'a RepositorySnapshot,
  id: BranchId,
}

impl<'a> BranchRef<'a> {
  pub const fn id(&self) -> BranchId {
    self.id
  }

  pub fn snapshot(&self) -> &'a RepositorySnapshot {
    self.snapshot
  }

  pub fn get(&self) -> &'a ManagedBranch {
    &self.snapshot.branches[self.id.0]
  }

  /// Declared parent; `None` for roots.
  pub fn upstream(&self) -> Option<BranchRef<'a>> {
    self.get().parent().map(|id| self.snapshot.branch(id))
  }

  pub fn children(&self) -> impl Iterator<Item = BranchRef<'a>> + 'a {
    let snapshot = self.snapshot;
    self.get().children.iter().map(move |id| snapshot.branch(*id))
  }

  /// Number of ancestors between this branch and its root.
  pub fn depth(&self) -> usize {
    std::iter::successors(self.upstream(), BranchRef::upstream).count()
  }

  pub fn is_current(&self) -> bool {
    self.snapshot.current_branch == Some(self.id)
  }

  pub fn rebase_parameters(&self) -> Result<GitRebaseParameters, RebaseParametersError> {
    compute_rebase_parameters(*self)
  }
}

impl Deref for BranchRef<'_> {
  type Target = ManagedBranch;

  fn deref(&self) -> &Self::Target {
    self.get()
  }
}

impl PartialEq for BranchRef<'_> {
  fn eq(&self, other: &Self) -> bool {
    std::ptr::eq(self.snapshot, other.snapshot) && self.id == other.id
  }
}

impl Eq for BranchRef<'_> {}

#[derive(Default)]
struct BuildState {
  branches: Vec<ManagedBranch>,
  root_branches: Vec<BranchId>,
  by_name: HashMap<BranchName, BranchId>,
  skipped_branch_names: Vec<String>,
}

/// Builds a [`RepositorySnapshot`] from a layout and an oracle.
pub struct SnapshotBuilder<'o, O: ?Sized> {
  oracle: &'o O,
}

impl<'o, O: CommitGraphOracle + ?Sized> SnapshotBuilder<'o, O> {
  pub const fn new(oracle: &'o O) -> Self {
    Self { oracle }
  }

  /// Resolve every layout entry and compute all statuses eagerly.
  ///
  /// Entries naming missing branches are recorded as skipped and their
  /// resolvable children become roots. Any oracle failure aborts the build.
  pub fn build(&self, layout: &BranchLayout) -> Result<RepositorySnapshot, SnapshotError> {
    let mut state = BuildState::default();
    for root in layout.roots() {
      self.visit(root, None, &mut state)?;
    }

    let current_branch_name = self.oracle.current_branch_name()?;
    let current_branch = current_branch_name
      .as_deref()
      .and_then(|name| state.by_name.get(name).copied());
    let ongoing_repository_operation = self.oracle.ongoing_operation()?;

    if !state.skipped_branch_names.is_empty() {
      warn!(skipped = ?state.skipped_branch_names, "layout names branches that do not exist");
    }
    debug!(
      managed = state.branches.len(),
      skipped = state.skipped_branch_names.len(),
      current = current_branch_name.as_deref().unwrap_or("<none>"),
      operation = %ongoing_repository_operation,
      "built repository snapshot"
    );

    Ok(RepositorySnapshot {
      branches: state.branches,
      root_branches: state.root_branches,
      by_name: state.by_name,
      current_branch,
      skipped_branch_names: state.skipped_branch_names,
      branch_layout: layout.clone(),
      ongoing_repository_operation,
    })
  }

  fn visit(
    &self,
    entry: &BranchLayoutEntry,
    parent: Option<BranchId>,
    state: &mut BuildState,
  ) -> Result<(), OracleError> {
    let name = entry.name();
    let Some(pointed_commit) = self.oracle.pointed_commit(name)? else {
      debug!(branch = name, "skipping layout entry without a local branch");
      state.skipped_branch_names.push(name.to_string());
      for child in entry.children() {
        self.visit(child, None, state)?;
      }
      return Ok(());
    };

    let kind = match parent {
      None => ManagedBranchKind::Root,
      Some(parent_id) => {
        let parent_commit = &state.branches[parent_id.0].pointed_commit.hash;
        let fork_point = self.oracle.fork_point(name)?;
        let sync_to_parent_status =
          compute_sync_to_parent_status(self.oracle, name, &pointed_commit.hash, parent_commit, fork_point.as_ref())?;
        let commits_since_fork_point = compute_commits_since_fork_point(self.oracle, name, fork_point.as_ref())?;

        ManagedBranchKind::NonRoot(NonRootBranch {
          parent: parent_id,
          sync_to_parent_status,
          fork_point,
          commits_since_fork_point,
        })
      }
    };
    let sync_to_origin_status = compute_sync_to_origin_status(self.oracle, name)?;

    let id = BranchId(state.branches.len());
    let branch_name = BranchName::from(name);
    state.branches.push(ManagedBranch {
      name: branch_name.clone(),
      pointed_commit,
      custom_annotation: entry.custom_annotation().map(str::to_string),
      qualifiers: entry.qualifiers(),
      children: Vec::new(),
      sync_to_origin_status,
      kind,
    });
    state.by_name.insert(branch_name, id);
    match parent {
      Some(parent_id) => state.branches[parent_id.0].children.push(id),
      None => state.root_branches.push(id),
    }

    for child in entry.children() {
      self.visit(child, Some(id), state)?;
    }
    Ok(())
  }
}
