//! Repository, config and layout location shared by every command.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use machete_core::{
  CommitGraphOracle, ConfigDirs, MacheteConfig, MacheteRepository, RepositorySnapshot, discover_repository,
};
use tracing::{debug, info};

pub struct CommandContext {
  /// `None` outside of a git repository.
  repository: Option<MacheteRepository>,
  config: MacheteConfig,
}

impl CommandContext {
  /// Discover the repository around `repo` (or the current directory) and
  /// resolve the layout file: `--layout`, then the config, then the default.
  pub fn load(repo: Option<&Path>, layout: Option<PathBuf>) -> Result<Self> {
    let config = match ConfigDirs::new() {
      Ok(dirs) => dirs.load_config().context("Failed to load configuration")?,
      Err(err) => {
        debug!(error = %err, "no config directory, using defaults");
        MacheteConfig::default()
      }
    };

    let start = match repo {
      Some(path) => path.to_path_buf(),
      None => env::current_dir().context("Failed to determine the current directory")?,
    };

    let repository = discover_repository(&start).map(|git_repo| {
      let layout_path = layout.or_else(|| git_repo.workdir().and_then(|workdir| config.layout_file_in(workdir)));
      MacheteRepository::new(git_repo, layout_path)
    });
    if let Some(repository) = &repository {
      info!(layout = %repository.layout_path().display(), "using layout file");
    }

    Ok(Self { repository, config })
  }

  pub fn config(&self) -> &MacheteConfig {
    &self.config
  }

  pub fn require_repository(&self) -> Result<&MacheteRepository> {
    self
      .repository
      .as_ref()
      .context("Not in a git repository")
  }

  /// Build a snapshot, `None` outside of a repository.
  pub fn snapshot(&self) -> Result<Option<RepositorySnapshot>> {
    self.repository.as_ref().map(build_snapshot).transpose()
  }

  pub fn require_snapshot(&self) -> Result<RepositorySnapshot> {
    build_snapshot(self.require_repository()?)
  }

  /// The branch named on the command line, or the checked-out one.
  pub fn branch_or_current(&self, branch: Option<String>) -> Result<String> {
    if let Some(branch) = branch {
      return Ok(branch);
    }
    self
      .require_repository()?
      .oracle()
      .current_branch_name()?
      .context("HEAD is detached; name a branch explicitly")
  }
}

fn build_snapshot(repository: &MacheteRepository) -> Result<RepositorySnapshot> {
  repository
    .snapshot()
    .with_context(|| format!("Failed to build snapshot from {}", repository.layout_path().display()))
}
