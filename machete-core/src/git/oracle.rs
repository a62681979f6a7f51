//! [`CommitGraphOracle`] backed by a `git2` repository.

use std::collections::HashSet;

use chrono::DateTime;
use git2::{Branch, BranchType, Commit, ErrorCode, Oid, Repository, RepositoryState, Sort};
use tracing::{debug, trace};

use crate::oracle::{
  CommitGraphOracle, CommitHash, CommitRecord, OngoingRepositoryOperation, OracleError, TrackingCounts,
};

/// Reflog entries written when a ref was created or force-moved rather than
/// grown by commits. They say nothing about where a branch forked from.
const IGNORED_REFLOG_PREFIXES: [&str; 3] = ["branch: Created from", "branch: Reset to", "reset: moving to"];

/// Config key holding a manually pinned fork point.
pub fn fork_point_override_key(branch: &str) -> String {
  format!("machete.overrideForkPoint.{branch}.to")
}

pub struct Git2Oracle {
  repo: Repository,
}

impl Git2Oracle {
  pub const fn new(repo: Repository) -> Self {
    Self { repo }
  }

  fn local_branch(&self, name: &str) -> Result<Option<Branch<'_>>, OracleError> {
    match self.repo.find_branch(name, BranchType::Local) {
      Ok(branch) => Ok(Some(branch)),
      Err(err) if matches!(err.code(), ErrorCode::NotFound | ErrorCode::InvalidSpec) => Ok(None),
      Err(err) => Err(err.into()),
    }
  }

  fn branch_tip(&self, name: &str) -> Result<Option<Oid>, OracleError> {
    let Some(branch) = self.local_branch(name)? else {
      return Ok(None);
    };
    Ok(Some(branch.get().peel_to_commit()?.id()))
  }

  fn existing_branch_tip(&self, name: &str) -> Result<Oid, OracleError> {
    self
      .branch_tip(name)?
      .ok_or_else(|| OracleError::unavailable(format!("branch '{name}' does not exist")))
  }

  fn fork_point_override(&self, branch: &str, tip: Oid) -> Result<Option<Oid>, OracleError> {
    let config = self.repo.config()?;
    let value = match config.get_string(&fork_point_override_key(branch)) {
      Ok(value) => value,
      Err(err) if err.code() == ErrorCode::NotFound => return Ok(None),
      Err(err) => return Err(err.into()),
    };

    let Ok(commit) = self.repo.revparse_single(value.trim()).and_then(|object| object.peel_to_commit()) else {
      debug!(branch, value = %value, "ignoring fork point override that does not name a commit");
      return Ok(None);
    };
    let candidate = commit.id();
    if candidate == tip || self.repo.graph_descendant_of(tip, candidate)? {
      Ok(Some(candidate))
    } else {
      debug!(branch, %candidate, "ignoring fork point override that is not an ancestor of the branch");
      Ok(None)
    }
  }

  /// Commits other local branches have pointed at, according to their reflogs.
  fn commits_seen_on_other_branches(&self, branch: &str) -> Result<HashSet<Oid>, OracleError> {
    let mut seen = HashSet::new();
    for entry in self.repo.branches(Some(BranchType::Local))? {
      let (other, _) = entry?;
      let Some(name) = other.name()? else {
        continue;
      };
      if name == branch {
        continue;
      }

      let reflog = self.repo.reflog(&format!("refs/heads/{name}"))?;
      for item in reflog.iter() {
        let message = item.message().unwrap_or_default();
        if IGNORED_REFLOG_PREFIXES.iter().any(|prefix| message.starts_with(prefix)) {
          continue;
        }
        if !item.id_new().is_zero() {
          seen.insert(item.id_new());
        }
      }
    }
    Ok(seen)
  }

  fn walk(&self, tip: Oid, hide: Option<Oid>) -> Result<git2::Revwalk<'_>, OracleError> {
    let mut revwalk = self.repo.revwalk()?;
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
    revwalk.push(tip)?;
    if let Some(hide) = hide {
      revwalk.hide(hide)?;
    }
    Ok(revwalk)
  }
}

fn record(commit: &Commit<'_>) -> CommitRecord {
  CommitRecord {
    hash: commit.id().into(),
    summary: commit.summary().unwrap_or_default().to_string(),
    committed_at: DateTime::from_timestamp(commit.time().seconds(), 0),
  }
}

fn parse_oid(hash: &CommitHash) -> Result<Oid, OracleError> {
  Ok(Oid::from_str(hash.as_str())?)
}

impl CommitGraphOracle for Git2Oracle {
  fn pointed_commit(&self, branch: &str) -> Result<Option<CommitRecord>, OracleError> {
    let Some(found) = self.local_branch(branch)? else {
      return Ok(None);
    };
    let commit = found.get().peel_to_commit()?;
    Ok(Some(record(&commit)))
  }

  fn fork_point(&self, branch: &str) -> Result<Option<CommitHash>, OracleError> {
    let Some(tip) = self.branch_tip(branch)? else {
      return Ok(None);
    };

    if let Some(pinned) = self.fork_point_override(branch, tip)? {
      trace!(branch, %pinned, "using fork point override");
      return Ok(Some(pinned.into()));
    }

    let seen = self.commits_seen_on_other_branches(branch)?;
    for oid in self.walk(tip, None)? {
      let oid = oid?;
      if seen.contains(&oid) {
        trace!(branch, %oid, "found fork point");
        return Ok(Some(oid.into()));
      }
    }

    debug!(branch, "no fork point found");
    Ok(None)
  }

  fn commits_until(&self, branch: &str, commit: &CommitHash) -> Result<Vec<CommitRecord>, OracleError> {
    let tip = self.existing_branch_tip(branch)?;
    let stop = parse_oid(commit)?;

    self
      .walk(tip, Some(stop))?
      .map(|oid| -> Result<CommitRecord, OracleError> {
        let found = self.repo.find_commit(oid?)?;
        Ok(record(&found))
      })
      .collect()
  }

  fn tracking_status(&self, branch: &str) -> Result<Option<TrackingCounts>, OracleError> {
    let Some(local) = self.local_branch(branch)? else {
      return Ok(None);
    };
    let upstream = match local.upstream() {
      Ok(upstream) => upstream,
      Err(err) if err.code() == ErrorCode::NotFound => return Ok(None),
      Err(err) => return Err(err.into()),
    };

    let local_oid = local.get().peel_to_commit()?.id();
    let upstream_oid = upstream.get().peel_to_commit()?.id();
    let (ahead, behind) = self.repo.graph_ahead_behind(local_oid, upstream_oid)?;
    Ok(Some(TrackingCounts::new(ahead, behind)))
  }

  fn is_ancestor(&self, ancestor: &CommitHash, descendant: &CommitHash) -> Result<bool, OracleError> {
    let ancestor = parse_oid(ancestor)?;
    let descendant = parse_oid(descendant)?;
    Ok(ancestor == descendant || self.repo.graph_descendant_of(descendant, ancestor)?)
  }

  fn has_just_been_created(&self, branch: &str) -> Result<bool, OracleError> {
    let Some(tip) = self.branch_tip(branch)? else {
      return Ok(false);
    };
    let reflog = self.repo.reflog(&format!("refs/heads/{branch}"))?;
    Ok(reflog.iter().all(|entry| entry.id_new() == tip))
  }

  fn current_branch_name(&self) -> Result<Option<String>, OracleError> {
    let head = match self.repo.head() {
      Ok(head) => head,
      Err(err) if matches!(err.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => return Ok(None),
      Err(err) => return Err(err.into()),
    };
    if !head.is_branch() {
      return Ok(None);
    }
    Ok(head.shorthand().map(str::to_string))
  }

  fn ongoing_operation(&self) -> Result<OngoingRepositoryOperation, OracleError> {
    let operation = match self.repo.state() {
      RepositoryState::Clean => OngoingRepositoryOperation::NoOperation,
      RepositoryState::Merge => OngoingRepositoryOperation::Merging,
      RepositoryState::Revert | RepositoryState::RevertSequence => OngoingRepositoryOperation::Reverting,
      RepositoryState::CherryPick | RepositoryState::CherryPickSequence => OngoingRepositoryOperation::CherryPicking,
      RepositoryState::Bisect => OngoingRepositoryOperation::Bisecting,
      RepositoryState::Rebase
      | RepositoryState::RebaseInteractive
      | RepositoryState::RebaseMerge
      | RepositoryState::ApplyMailboxOrRebase => OngoingRepositoryOperation::Rebasing,
      RepositoryState::ApplyMailbox => OngoingRepositoryOperation::ApplyingMailbox,
    };
    Ok(operation)
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use machete_test_utils::git::{
    GitRepoTestGuard, checkout_branch, create_branch, create_commit, head_commit, set_upstream,
  };

  use super::*;
  use crate::branch::{SyncToParentStatus, compute_sync_to_parent_status};

  fn oracle(guard: &GitRepoTestGuard) -> Git2Oracle {
    Git2Oracle::new(Repository::open(guard.path()).unwrap())
  }

  fn tip(oracle: &Git2Oracle, branch: &str) -> CommitHash {
    oracle.pointed_commit(branch).unwrap().unwrap().hash
  }

  fn parent_status(oracle: &Git2Oracle, parent: &str, child: &str) -> SyncToParentStatus {
    let fork_point = oracle.fork_point(child).unwrap();
    compute_sync_to_parent_status(oracle, child, &tip(oracle, child), &tip(oracle, parent), fork_point.as_ref())
      .unwrap()
  }

  /// main: base ── main-2
  ///          └── topic-1   (topic)
  fn diverged_repo() -> GitRepoTestGuard {
    let guard = GitRepoTestGuard::new();
    create_commit(&guard.repo, "base.txt", "base", "base").unwrap();
    create_branch(&guard.repo, "topic", None).unwrap();
    checkout_branch(&guard.repo, "topic").unwrap();
    create_commit(&guard.repo, "topic.txt", "topic", "topic-1").unwrap();
    checkout_branch(&guard.repo, "main").unwrap();
    create_commit(&guard.repo, "main.txt", "main", "main-2").unwrap();
    guard
  }

  #[test]
  fn missing_branch_is_not_an_error() {
    let guard = diverged_repo();
    let oracle = oracle(&guard);

    assert!(oracle.pointed_commit("ghost").unwrap().is_none());
    assert!(oracle.fork_point("ghost").unwrap().is_none());
    assert!(oracle.tracking_status("ghost").unwrap().is_none());
    assert!(!oracle.has_just_been_created("ghost").unwrap());
  }

  #[test]
  fn pointed_commit_carries_summary_and_time() {
    let guard = diverged_repo();
    let record = oracle(&guard).pointed_commit("topic").unwrap().unwrap();

    assert_eq!(record.summary, "topic-1");
    assert!(record.committed_at.is_some());
  }

  #[test]
  fn fork_point_comes_from_parent_reflog() {
    let guard = diverged_repo();
    let oracle = oracle(&guard);
    let base = head_commit(&guard.repo, "main~1").unwrap();

    assert_eq!(oracle.fork_point("topic").unwrap().map(|hash| hash.to_string()), Some(base));
    assert_eq!(parent_status(&oracle, "main", "topic"), SyncToParentStatus::OutOfSync);

    let commits = oracle.commits_until("topic", &oracle.fork_point("topic").unwrap().unwrap()).unwrap();
    let summaries: Vec<_> = commits.iter().map(|commit| commit.summary.as_str()).collect();
    assert_eq!(summaries, vec!["topic-1"]);
  }

  #[test]
  fn stacked_branch_is_in_sync() {
    let guard = GitRepoTestGuard::new();
    create_commit(&guard.repo, "base.txt", "base", "base").unwrap();
    create_branch(&guard.repo, "topic", None).unwrap();
    checkout_branch(&guard.repo, "topic").unwrap();
    create_commit(&guard.repo, "topic.txt", "one", "topic-1").unwrap();
    create_commit(&guard.repo, "topic.txt", "two", "topic-2").unwrap();
    let oracle = oracle(&guard);

    assert_eq!(parent_status(&oracle, "main", "topic"), SyncToParentStatus::InSync);
    assert_eq!(oracle.current_branch_name().unwrap().as_deref(), Some("topic"));

    let fork_point = oracle.fork_point("topic").unwrap().unwrap();
    assert_eq!(oracle.commits_until("topic", &fork_point).unwrap().len(), 2);
  }

  #[test]
  fn fresh_branch_is_in_sync_until_it_moves() {
    let guard = diverged_repo();
    create_branch(&guard.repo, "fresh", Some("main")).unwrap();
    let oracle = oracle(&guard);

    assert!(oracle.has_just_been_created("fresh").unwrap());
    assert!(!oracle.has_just_been_created("main").unwrap());
    assert_eq!(parent_status(&oracle, "main", "fresh"), SyncToParentStatus::InSync);
  }

  #[test]
  fn fast_forwarded_parent_makes_branch_merged() {
    let guard = diverged_repo();
    create_branch(&guard.repo, "done", Some("main")).unwrap();
    checkout_branch(&guard.repo, "done").unwrap();
    create_commit(&guard.repo, "done.txt", "done", "done-1").unwrap();
    checkout_branch(&guard.repo, "main").unwrap();
    let done_tip = guard.repo.revparse_single("done").unwrap().id();
    guard
      .repo
      .reference("refs/heads/main", done_tip, true, "merge done: Fast-forward")
      .unwrap();

    let oracle = oracle(&guard);
    assert_eq!(parent_status(&oracle, "main", "done"), SyncToParentStatus::Merged);
  }

  #[test]
  fn fork_point_override_wins_when_it_is_an_ancestor() {
    let guard = diverged_repo();
    create_branch(&guard.repo, "stack", Some("topic")).unwrap();
    checkout_branch(&guard.repo, "stack").unwrap();
    create_commit(&guard.repo, "stack.txt", "stack", "stack-1").unwrap();
    let topic_tip = head_commit(&guard.repo, "topic").unwrap();
    let base = head_commit(&guard.repo, "main~1").unwrap();
    let fork_point = |guard: &GitRepoTestGuard| oracle(guard).fork_point("stack").unwrap().map(|hash| hash.to_string());

    assert_eq!(fork_point(&guard), Some(topic_tip.clone()));

    let mut config = guard.repo.config().unwrap();
    config.set_str(&fork_point_override_key("stack"), &base).unwrap();
    assert_eq!(fork_point(&guard), Some(base));

    let unrelated = head_commit(&guard.repo, "main").unwrap();
    config.set_str(&fork_point_override_key("stack"), &unrelated).unwrap();
    assert_eq!(fork_point(&guard), Some(topic_tip));
  }

  #[test]
  fn tracking_counts_follow_upstream() {
    let guard = diverged_repo();
    set_upstream(&guard.repo, "topic", "main").unwrap();
    let oracle = oracle(&guard);

    assert_eq!(oracle.tracking_status("topic").unwrap(), Some(TrackingCounts::new(1, 1)));
    assert_eq!(oracle.tracking_status("main").unwrap(), None);
  }

  #[test]
  fn ancestry_is_inclusive() {
    let guard = diverged_repo();
    let oracle = oracle(&guard);
    let main = tip(&oracle, "main");
    let topic = tip(&oracle, "topic");
    let base: CommitHash = head_commit(&guard.repo, "main~1").unwrap().as_str().into();

    assert!(oracle.is_ancestor(&main, &main).unwrap());
    assert!(oracle.is_ancestor(&base, &topic).unwrap());
    assert!(!oracle.is_ancestor(&main, &topic).unwrap());
  }

  #[test]
  fn detached_head_has_no_current_branch() {
    let guard = diverged_repo();
    let head = guard.repo.head().unwrap().peel_to_commit().unwrap().id();
    guard.repo.set_head_detached(head).unwrap();

    assert_eq!(oracle(&guard).current_branch_name().unwrap(), None);
  }

  #[test]
  fn merge_in_progress_is_detected() {
    let guard = diverged_repo();
    let topic = head_commit(&guard.repo, "topic").unwrap();
    fs::write(guard.repo.path().join("MERGE_HEAD"), format!("{topic}\n")).unwrap();

    assert_eq!(oracle(&guard).ongoing_operation().unwrap(), OngoingRepositoryOperation::Merging);
  }
}
