//! CLI command implementations

mod pool;
mod run;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hashpipe::config::Config;

pub use pool::cmd_pool;
pub use run::cmd_run;

/// Load config from an explicit path, or from the usual locations.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
  match path {
    Some(path) => Config::load_from(path).with_context(|| format!("Failed to load config {}", path.display())),
    None => {
      let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
      Ok(Config::load(&cwd))
    }
  }
}
