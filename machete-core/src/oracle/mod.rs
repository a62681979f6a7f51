//! Commit-graph oracle consumed by the snapshot builder.
//!
//! The engine never walks refs or reflogs itself. Everything it needs to know
//! about the repository is asked through [`CommitGraphOracle`], which keeps the
//! status computations testable against an in-memory graph
//! ([`memory::MemoryOracle`]) and lets the `git2` backend
//! ([`crate::git::Git2Oracle`]) evolve independently.

pub mod memory;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub use memory::MemoryOracle;

/// Hex encoded object id of a commit.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(transparent)]
pub struct CommitHash(String);

impl CommitHash {
  /// Wrap a hex object id.
  pub fn new(hash: impl Into<String>) -> Self {
    Self(hash.into())
  }

  /// Borrow the full hex representation.
  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Abbreviated form used in human-facing output.
  pub fn short(&self) -> &str {
    let end = self.0.char_indices().nth(7).map_or(self.0.len(), |(idx, _)| idx);
    &self.0[..end]
  }
}

impl fmt::Debug for CommitHash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("CommitHash").field(&self.as_str()).finish()
  }
}

impl fmt::Display for CommitHash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl From<&str> for CommitHash {
  fn from(value: &str) -> Self {
    Self::new(value)
  }
}

impl From<git2::Oid> for CommitHash {
  fn from(value: git2::Oid) -> Self {
    Self::new(value.to_string())
  }
}

/// Summary of a single commit as reported by the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
  /// Object id of the commit.
  pub hash: CommitHash,
  /// First line of the commit message.
  pub summary: String,
  /// Commit timestamp in UTC, when the backend knows it.
  pub committed_at: Option<DateTime<Utc>>,
}

impl CommitRecord {
  pub fn new(hash: impl Into<CommitHash>, summary: impl Into<String>) -> Self {
    Self {
      hash: hash.into(),
      summary: summary.into(),
      committed_at: None,
    }
  }
}

/// Ahead/behind counts of a local branch relative to its remote counterpart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrackingCounts {
  /// Commits on the local branch missing from the remote one.
  pub ahead: usize,
  /// Commits on the remote branch missing from the local one.
  pub behind: usize,
}

impl TrackingCounts {
  pub const fn new(ahead: usize, behind: usize) -> Self {
    Self { ahead, behind }
  }
}

/// Multi-step operation the repository is in the middle of.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OngoingRepositoryOperation {
  #[default]
  NoOperation,
  CherryPicking,
  Merging,
  Rebasing,
  Reverting,
  ApplyingMailbox,
  Bisecting,
}

impl OngoingRepositoryOperation {
  /// Returns `true` when some operation is mid-flight.
  pub const fn is_in_progress(self) -> bool {
    !matches!(self, Self::NoOperation)
  }
}

impl fmt::Display for OngoingRepositoryOperation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      Self::NoOperation => "no operation",
      Self::CherryPicking => "cherry-pick",
      Self::Merging => "merge",
      Self::Rebasing => "rebase",
      Self::Reverting => "revert",
      Self::ApplyingMailbox => "am",
      Self::Bisecting => "bisect",
    };
    f.write_str(label)
  }
}

/// Failure reported by a [`CommitGraphOracle`].
#[derive(Debug, Error)]
pub enum OracleError {
  /// The repository cannot be read (missing, corrupt, timed out query).
  #[error("repository unavailable: {reason}")]
  Unavailable { reason: String },
  /// Wrapper for lower-level errors originating from `git2`.
  #[error(transparent)]
  Git(#[from] git2::Error),
}

impl OracleError {
  pub fn unavailable(reason: impl Into<String>) -> Self {
    Self::Unavailable { reason: reason.into() }
  }
}

/// Read-only view of a repository's commit graph.
///
/// Branch names are local branch short names (`feature/login`, not
/// `refs/heads/feature/login`). Implementations must answer consistently for
/// the duration of one snapshot build; callers serialise builds against
/// repository mutations.
pub trait CommitGraphOracle {
  /// Commit the local branch points at, or `None` when no such branch exists.
  fn pointed_commit(&self, branch: &str) -> Result<Option<CommitRecord>, OracleError>;

  /// Commit the branch was forked from, when one can be determined.
  fn fork_point(&self, branch: &str) -> Result<Option<CommitHash>, OracleError>;

  /// Commits reachable from the branch tip but not from `commit`,
  /// most-recent-first.
  fn commits_until(&self, branch: &str, commit: &CommitHash) -> Result<Vec<CommitRecord>, OracleError>;

  /// Ahead/behind counts against the remote counterpart, `None` when the
  /// branch tracks nothing.
  fn tracking_status(&self, branch: &str) -> Result<Option<TrackingCounts>, OracleError>;

  /// Whether `ancestor` is reachable from `descendant` through parent links.
  fn is_ancestor(&self, ancestor: &CommitHash, descendant: &CommitHash) -> Result<bool, OracleError>;

  /// Whether the branch has not moved since it was created.
  fn has_just_been_created(&self, branch: &str) -> Result<bool, OracleError>;

  /// Name of the checked-out branch, `None` on a detached HEAD.
  fn current_branch_name(&self) -> Result<Option<String>, OracleError>;

  /// Multi-step operation in progress, if any.
  fn ongoing_operation(&self) -> Result<OngoingRepositoryOperation, OracleError>;
}

impl<T: CommitGraphOracle + ?Sized> CommitGraphOracle for &T {
  fn pointed_commit(&self, branch: &str) -> Result<Option<CommitRecord>, OracleError> {
    (**self).pointed_commit(branch)
  }

  fn fork_point(&self, branch: &str) -> Result<Option<CommitHash>, OracleError> {
    (**self).fork_point(branch)
  }

  fn commits_until(&self, branch: &str, commit: &CommitHash) -> Result<Vec<CommitRecord>, OracleError> {
    (**self).commits_until(branch, commit)
  }

  fn tracking_status(&self, branch: &str) -> Result<Option<TrackingCounts>, OracleError> {
    (**self).tracking_status(branch)
  }

  fn is_ancestor(&self, ancestor: &CommitHash, descendant: &CommitHash) -> Result<bool, OracleError> {
    (**self).is_ancestor(ancestor, descendant)
  }

  fn has_just_been_created(&self, branch: &str) -> Result<bool, OracleError> {
    (**self).has_just_been_created(branch)
  }

  fn current_branch_name(&self) -> Result<Option<String>, OracleError> {
    (**self).current_branch_name()
  }

  fn ongoing_operation(&self) -> Result<OngoingRepositoryOperation, OracleError> {
    (**self).ongoing_operation()
  }
}
