//! # Machete Core Library
//!
//! Overlays a declared branch layout (which local branch is stacked on which
//! parent) on a repository's commit graph and computes an immutable
//! [`RepositorySnapshot`]: per branch, its sync status to its parent and to
//! origin, the commits it owns since its fork point, and the parameters needed
//! to rebase it back onto its parent.
//!
//! The repository is reached only through [`CommitGraphOracle`], implemented
//! by [`Git2Oracle`] for real repositories and by [`MemoryOracle`] for tests.

pub mod branch;
pub mod config;
pub mod events;
pub mod git;
pub mod layout;
pub mod oracle;
pub mod rebase;
pub mod snapshot;
pub mod traverse;

pub use branch::{
  BranchId, BranchName, ManagedBranch, ManagedBranchKind, NonRootBranch, SyncToOriginStatus, SyncToParentStatus,
};
pub use config::{ConfigDirs, ConfigError, MacheteConfig, TraverseConfig};
pub use events::{SnapshotEvent, collect_events};
pub use git::{Git2Oracle, MacheteRepository, discover_repository};
pub use layout::io::{LayoutFileError, read_layout_file, write_layout_file};
pub use layout::{
  BranchLayout, BranchLayoutEntry, BranchLayoutReader, BranchLayoutWriter, BranchQualifiers, LayoutEditError,
  LayoutParseError, LayoutParseErrorKind,
};
pub use oracle::{
  CommitGraphOracle, CommitHash, CommitRecord, MemoryOracle, OngoingRepositoryOperation, OracleError, TrackingCounts,
};
pub use rebase::{GitRebaseParameters, PRE_REBASE_HOOK, RebaseParametersError, compute_rebase_parameters};
pub use snapshot::{BranchRef, RepositorySnapshot, SnapshotBuilder, SnapshotError};
pub use traverse::{SuggestedAction, TraverseOptions, TraverseStep, plan_slide_out, plan_traverse};
