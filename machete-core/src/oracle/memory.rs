//! In-memory commit graph used by tests and by embedders without a git
//! repository at hand.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use super::{CommitGraphOracle, CommitHash, CommitRecord, OngoingRepositoryOperation, OracleError, TrackingCounts};

#[derive(Debug, Clone)]
struct MemoryCommit {
  parents: Vec<CommitHash>,
  summary: String,
  /// Insertion order; later commits are considered more recent.
  sequence: usize,
}

#[derive(Debug, Clone)]
struct MemoryBranch {
  tip: CommitHash,
  fork_point: Option<CommitHash>,
  just_created: bool,
  tracking: Option<TrackingCounts>,
}

/// Hand-built commit graph implementing [`CommitGraphOracle`].
///
/// Commits must be added parents-first. Fork points, tracking counts and the
/// "just created" flag are stored verbatim per branch rather than derived, so
/// tests can set up any combination directly.
#[derive(Debug, Clone, Default)]
pub struct MemoryOracle {
  commits: HashMap<CommitHash, MemoryCommit>,
  branches: BTreeMap<String, MemoryBranch>,
  current_branch: Option<String>,
  operation: OngoingRepositoryOperation,
  failure: Option<String>,
}

impl MemoryOracle {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record a commit with the given parents.
  pub fn commit(&mut self, hash: &str, parents: &[&str]) -> &mut Self {
    let sequence = self.commits.len();
    self.commits.insert(
      CommitHash::from(hash),
      MemoryCommit {
        parents: parents.iter().copied().map(CommitHash::from).collect(),
        summary: format!("commit {hash}"),
        sequence,
      },
    );
    self
  }

  /// Record a linear history where each commit is the parent of the next.
  pub fn chain(&mut self, hashes: &[&str]) -> &mut Self {
    let mut parent: Option<&str> = None;
    for hash in hashes {
      match parent {
        Some(parent) if !self.commits.contains_key(&CommitHash::from(*hash)) => {
          self.commit(hash, &[parent]);
        }
        None if !self.commits.contains_key(&CommitHash::from(*hash)) => {
          self.commit(hash, &[]);
        }
        _ => {}
      }
      parent = Some(*hash);
    }
    self
  }

  /// Create or move a branch. New branches start without fork point,
  /// tracking or "just created" flag.
  pub fn branch(&mut self, name: &str, tip: &str) -> &mut Self {
    let tip = CommitHash::from(tip);
    self
      .branches
      .entry(name.to_string())
      .and_modify(|branch| branch.tip = tip.clone())
      .or_insert(MemoryBranch {
        tip,
        fork_point: None,
        just_created: false,
        tracking: None,
      });
    self
  }

  pub fn delete_branch(&mut self, name: &str) -> &mut Self {
    self.branches.remove(name);
    if self.current_branch.as_deref() == Some(name) {
      self.current_branch = None;
    }
    self
  }

  pub fn set_fork_point(&mut self, branch: &str, commit: Option<&str>) -> &mut Self {
    if let Some(entry) = self.branches.get_mut(branch) {
      entry.fork_point = commit.map(CommitHash::from);
    }
    self
  }

  pub fn set_just_created(&mut self, branch: &str, just_created: bool) -> &mut Self {
    if let Some(entry) = self.branches.get_mut(branch) {
      entry.just_created = just_created;
    }
    self
  }

  pub fn set_tracking(&mut self, branch: &str, counts: Option<TrackingCounts>) -> &mut Self {
    if let Some(entry) = self.branches.get_mut(branch) {
      entry.tracking = counts;
    }
    self
  }

  pub fn checkout(&mut self, branch: Option<&str>) -> &mut Self {
    self.current_branch = branch.map(str::to_string);
    self
  }

  pub fn set_operation(&mut self, operation: OngoingRepositoryOperation) -> &mut Self {
    self.operation = operation;
    self
  }

  /// Make every subsequent query fail as if the repository went away.
  pub fn fail_with(&mut self, reason: &str) -> &mut Self {
    self.failure = Some(reason.to_string());
    self
  }

  fn check_available(&self) -> Result<(), OracleError> {
    match &self.failure {
      Some(reason) => Err(OracleError::unavailable(reason.clone())),
      None => Ok(()),
    }
  }

  fn record(&self, hash: &CommitHash) -> CommitRecord {
    let summary = self
      .commits
      .get(hash)
      .map(|commit| commit.summary.clone())
      .unwrap_or_default();
    CommitRecord::new(hash.clone(), summary)
  }

  fn reachable_from(&self, start: &CommitHash) -> HashSet<CommitHash> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([start.clone()]);

    while let Some(current) = queue.pop_front() {
      if !seen.insert(current.clone()) {
        continue;
      }
      if let Some(commit) = self.commits.get(&current) {
        queue.extend(commit.parents.iter().cloned());
      }
    }

    seen
  }

  fn tip_of(&self, branch: &str) -> Result<&CommitHash, OracleError> {
    self
      .branches
      .get(branch)
      .map(|entry| &entry.tip)
      .ok_or_else(|| OracleError::unavailable(format!("unknown branch '{branch}'")))
  }
}

impl CommitGraphOracle for MemoryOracle {
  fn pointed_commit(&self, branch: &str) -> Result<Option<CommitRecord>, OracleError> {
    self.check_available()?;
    Ok(self.branches.get(branch).map(|entry| self.record(&entry.tip)))
  }

  fn fork_point(&self, branch: &str) -> Result<Option<CommitHash>, OracleError> {
    self.check_available()?;
    Ok(self.branches.get(branch).and_then(|entry| entry.fork_point.clone()))
  }

  fn commits_until(&self, branch: &str, commit: &CommitHash) -> Result<Vec<CommitRecord>, OracleError> {
    self.check_available()?;
    let tip = self.tip_of(branch)?;
    let excluded = self.reachable_from(commit);

    let mut owned: Vec<&CommitHash> = self
      .reachable_from(tip)
      .into_iter()
      .filter(|hash| !excluded.contains(hash))
      .filter_map(|hash| self.commits.get_key_value(&hash).map(|(key, _)| key))
      .collect();
    owned.sort_by_key(|hash| std::cmp::Reverse(self.commits.get(*hash).map_or(0, |commit| commit.sequence)));

    Ok(owned.into_iter().map(|hash| self.record(hash)).collect())
  }

  fn tracking_status(&self, branch: &str) -> Result<Option<TrackingCounts>, OracleError> {
    self.check_available()?;
    Ok(self.branches.get(branch).and_then(|entry| entry.tracking))
  }

  fn is_ancestor(&self, ancestor: &CommitHash, descendant: &CommitHash) -> Result<bool, OracleError> {
    self.check_available()?;
    Ok(self.reachable_from(descendant).contains(ancestor))
  }

  fn has_just_been_created(&self, branch: &str) -> Result<bool, OracleError> {
    self.check_available()?;
    Ok(self.branches.get(branch).is_some_and(|entry| entry.just_created))
  }

  fn current_branch_name(&self) -> Result<Option<String>, OracleError> {
    self.check_available()?;
    Ok(self.current_branch.clone())
  }

  fn ongoing_operation(&self) -> Result<OngoingRepositoryOperation, OracleError> {
    self.check_available()?;
    Ok(self.operation)
  }
}
