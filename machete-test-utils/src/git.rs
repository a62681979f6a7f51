//! Temporary git repositories for tests
//!
//! Repositories start on an unborn `main` branch with a test identity
//! configured, so the first [`create_commit`] creates `main`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use git2::{BranchType, Repository, RepositoryInitOptions, Signature};
use tempfile::TempDir;

/// Layout file name inside the git directory.
const LAYOUT_FILE_NAME: &str = "machete";

/// A temporary git repository, removed when the guard is dropped.
pub struct GitRepoTestGuard {
  /// The temporary directory containing the git repository
  pub temp_dir: TempDir,
  /// The git repository
  pub repo: Repository,
}

impl GitRepoTestGuard {
  /// Create a new test git repository whose initial branch is `main`
  pub fn new() -> Self {
    let temp_dir = TempDir::new().expect("Failed to create temporary directory");

    let mut options = RepositoryInitOptions::new();
    options.initial_head("main");
    let repo = Repository::init_opts(temp_dir.path(), &options).expect("Failed to initialize git repository");

    let mut config = repo.config().expect("Failed to get repository config");
    config
      .set_str("user.name", "Machete Test User")
      .expect("Failed to set user.name");
    config
      .set_str("user.email", "machete-test@example.com")
      .expect("Failed to set user.email");
    // Fork points are derived from reflogs.
    config
      .set_bool("core.logAllRefUpdates", true)
      .expect("Failed to enable reflogs");

    Self { temp_dir, repo }
  }

  /// Get the path to the working directory
  pub fn path(&self) -> &Path {
    self.temp_dir.path()
  }
}

impl Default for GitRepoTestGuard {
  fn default() -> Self {
    Self::new()
  }
}

/// Write `file_name` and commit it on top of HEAD
pub fn create_commit(repo: &Repository, file_name: &str, content: &str, message: &str) -> Result<()> {
  let workdir = repo.workdir().context("Repository has no working directory")?;
  fs::write(workdir.join(file_name), content)?;

  let mut index = repo.index()?;
  index.add_path(Path::new(file_name))?;
  index.write()?;

  let tree = repo.find_tree(index.write_tree()?)?;
  let signature = Signature::now("Test User", "test@example.com")?;
  let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
  let parents: Vec<_> = parent.iter().collect();

  repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
  Ok(())
}

/// Create a branch at `start_point` (a local branch name) or at HEAD
pub fn create_branch(repo: &Repository, branch_name: &str, start_point: Option<&str>) -> Result<()> {
  let target = match start_point {
    Some(start) => repo
      .find_branch(start, BranchType::Local)?
      .into_reference()
      .peel_to_commit()?,
    None => repo.head()?.peel_to_commit()?,
  };

  repo.branch(branch_name, &target, false)?;
  Ok(())
}

/// Check out a local branch, updating index and working tree
pub fn checkout_branch(repo: &Repository, branch_name: &str) -> Result<()> {
  let commit = repo
    .revparse_single(&format!("refs/heads/{branch_name}"))?
    .peel_to_commit()?;

  repo.checkout_tree(commit.as_object(), Some(git2::build::CheckoutBuilder::new().force()))?;
  repo.set_head(&format!("refs/heads/{branch_name}"))?;
  Ok(())
}

/// Make `branch_name` track `upstream` (a local branch, or `remote/branch`)
pub fn set_upstream(repo: &Repository, branch_name: &str, upstream: &str) -> Result<()> {
  let mut branch = repo.find_branch(branch_name, BranchType::Local)?;
  branch
    .set_upstream(Some(upstream))
    .with_context(|| format!("Failed to set upstream of '{branch_name}' to '{upstream}'"))?;
  Ok(())
}

/// Full hash of the commit a revision expression resolves to
pub fn head_commit(repo: &Repository, revision: &str) -> Result<String> {
  let commit = repo.revparse_single(revision)?.peel_to_commit()?;
  Ok(commit.id().to_string())
}

/// Write the layout file at its default location
pub fn write_layout(repo: &Repository, content: &str) -> Result<()> {
  fs::write(repo.commondir().join(LAYOUT_FILE_NAME), content)?;
  Ok(())
}

/// Read the layout file back, empty when it does not exist
pub fn read_layout(repo: &Repository) -> Result<String> {
  let path = repo.commondir().join(LAYOUT_FILE_NAME);
  if !path.exists() {
    return Ok(String::new());
  }
  Ok(fs::read_to_string(path)?)
}
