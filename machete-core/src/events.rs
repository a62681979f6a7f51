//! Notable conditions discovered after a snapshot build.
//!
//! Returned as plain data so the caller decides whether to warn, prompt or
//! ignore.

use serde::Serialize;

use crate::layout::BranchLayout;
use crate::oracle::OngoingRepositoryOperation;
use crate::snapshot::RepositorySnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum SnapshotEvent {
  /// Layout entries that name no local branch.
  BranchesSkipped { names: Vec<String> },
  /// A layout proposed by some other source differs from the one in use.
  LayoutCandidateDiffers { candidate: BranchLayout },
  /// The repository is in the middle of a multi-step operation.
  OperationInProgress { operation: OngoingRepositoryOperation },
}

pub fn collect_events(snapshot: &RepositorySnapshot, candidate: Option<&BranchLayout>) -> Vec<SnapshotEvent> {
  let mut events = Vec::new();

  if !snapshot.skipped_branch_names().is_empty() {
    events.push(SnapshotEvent::BranchesSkipped {
      names: snapshot.skipped_branch_names().to_vec(),
    });
  }

  if let Some(candidate) = candidate
    && !candidate.same_entries(snapshot.branch_layout())
  {
    events.push(SnapshotEvent::LayoutCandidateDiffers {
      candidate: candidate.clone(),
    });
  }

  let operation = snapshot.ongoing_repository_operation();
  if operation.is_in_progress() {
    events.push(SnapshotEvent::OperationInProgress { operation });
  }

  events
}
