//! Repository discovery and the snapshot entry point used by front ends.

use std::path::{Path, PathBuf};

use git2::Repository;
use tracing::debug;

use super::oracle::Git2Oracle;
use crate::layout::BranchLayout;
use crate::layout::io::{LayoutFileError, read_layout_file, write_layout_file};
use crate::snapshot::{RepositorySnapshot, SnapshotBuilder, SnapshotError};

/// File name of the layout inside the git directory.
pub const LAYOUT_FILE_NAME: &str = "machete";

/// Open the repository containing `path`, or `None` outside of any repository.
pub fn discover_repository<P: AsRef<Path>>(path: P) -> Option<Repository> {
  match Repository::discover(path.as_ref()) {
    Ok(repo) => Some(repo),
    Err(err) => {
      debug!(path = %path.as_ref().display(), error = %err, "no git repository found");
      None
    }
  }
}

/// Default layout location: the common git directory, so every worktree of a
/// repository shares one layout.
pub fn default_layout_path(repo: &Repository) -> PathBuf {
  repo.commondir().join(LAYOUT_FILE_NAME)
}

/// Repository together with the layout file it is managed by.
pub struct MacheteRepository {
  oracle: Git2Oracle,
  layout_path: PathBuf,
}

impl MacheteRepository {
  /// Use `layout_path` when given, the default location otherwise.
  pub fn new(repo: Repository, layout_path: Option<PathBuf>) -> Self {
    let layout_path = layout_path.unwrap_or_else(|| default_layout_path(&repo));
    Self {
      oracle: Git2Oracle::new(repo),
      layout_path,
    }
  }

  /// Discover the repository containing `path`; `None` outside of any repository.
  pub fn discover<P: AsRef<Path>>(path: P, layout_path: Option<PathBuf>) -> Option<Self> {
    discover_repository(path).map(|repo| Self::new(repo, layout_path))
  }

  pub fn oracle(&self) -> &Git2Oracle {
    &self.oracle
  }

  pub fn layout_path(&self) -> &Path {
    &self.layout_path
  }

  pub fn read_layout(&self) -> Result<BranchLayout, LayoutFileError> {
    read_layout_file(&self.layout_path)
  }

  pub fn write_layout(&self, layout: &BranchLayout) -> Result<(), LayoutFileError> {
    write_layout_file(&self.layout_path, layout)
  }

  /// Read the layout file and build a fresh snapshot.
  pub fn snapshot(&self) -> Result<RepositorySnapshot, SnapshotError> {
    let layout = self.read_layout()?;
    Ok(SnapshotBuilder::new(&self.oracle).build(&layout)?)
  }
}
