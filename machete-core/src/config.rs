//! # Configuration
//!
//! User-level settings stored as TOML under the platform config directory
//! (`$XDG_CONFIG_HOME/machete/config.toml` on Linux).

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::traverse::TraverseOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to determine the configuration directory")]
  NoConfigDir,
  #[error("failed to access config file {}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("failed to parse config file {}", .path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },
}

/// Represents the configuration directories for machete
#[derive(Debug, Clone)]
pub struct ConfigDirs {
  config_dir: PathBuf,
}

impl ConfigDirs {
  pub fn new() -> Result<Self, ConfigError> {
    let proj_dirs = ProjectDirs::from("", "", "machete").ok_or(ConfigError::NoConfigDir)?;
    Ok(Self {
      config_dir: proj_dirs.config_dir().to_path_buf(),
    })
  }

  pub fn config_path(&self) -> PathBuf {
    self.config_dir.join("config.toml")
  }

  /// Load the user config, falling back to defaults when none exists.
  pub fn load_config(&self) -> Result<MacheteConfig, ConfigError> {
    MacheteConfig::load_from(self.config_path())
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MacheteConfig {
  /// Layout file to use instead of `<git dir>/machete`. Relative paths are
  /// resolved against the repository's working directory.
  pub layout_file: Option<PathBuf>,
  pub traverse: TraverseConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TraverseConfig {
  pub push: bool,
  pub pull: bool,
}

impl Default for TraverseConfig {
  fn default() -> Self {
    Self { push: true, pull: true }
  }
}

impl From<&TraverseConfig> for TraverseOptions {
  fn from(config: &TraverseConfig) -> Self {
    Self {
      push: config.push,
      pull: config.pull,
    }
  }
}

impl MacheteConfig {
  /// Read `path`; a missing file yields the defaults.
  pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = match fs::read_to_string(path) {
      Ok(content) => content,
      Err(err) if err.kind() == ErrorKind::NotFound => {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Self::default());
      }
      Err(source) => {
        return Err(ConfigError::Io {
          path: path.to_path_buf(),
          source,
        });
      }
    };

    toml::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Layout file override resolved against `workdir`.
  pub fn layout_file_in(&self, workdir: &Path) -> Option<PathBuf> {
    self.layout_file.as_ref().map(|file| workdir.join(file))
  }
}
