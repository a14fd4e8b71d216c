//! Configuration for hashpipe.
//!
//! Config priority: explicit path > working directory (hashpipe.toml) > user (~/.config/hashpipe/config.toml)

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use serde::{Deserialize, Serialize};

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "hashpipe.toml";

// ============================================================================
// Pipeline Configuration
// ============================================================================

/// Signing pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  /// Buffer size of every channel between two stages (default: 100)
  pub channel_buffer: usize,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self { channel_buffer: 100 }
  }
}

// ============================================================================
// Signer Configuration
// ============================================================================

/// Artificial latencies of the default digest provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
  /// Latency of one rate-limited digest call in milliseconds (default: 10)
  pub limited_latency_ms: u64,

  /// Latency of one unlimited digest call in milliseconds (default: 0)
  pub unlimited_latency_ms: u64,
}

impl Default for SignerConfig {
  fn default() -> Self {
    Self {
      limited_latency_ms: 10,
      unlimited_latency_ms: 0,
    }
  }
}

impl SignerConfig {
  pub fn limited_latency(&self) -> Duration {
    Duration::from_millis(self.limited_latency_ms)
  }

  pub fn unlimited_latency(&self) -> Duration {
    Duration::from_millis(self.unlimited_latency_ms)
  }
}

// ============================================================================
// Pool Configuration
// ============================================================================

/// Worker pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
  /// Workers started before any command is processed (default: 10)
  pub initial_workers: usize,

  /// Pause between two generated values in milliseconds (default: 5000)
  pub generator_interval_ms: u64,

  /// Generators stop once their counter reaches this value (default: 10000)
  pub generator_limit: u64,

  /// Time the default sink consumer spends per received value in milliseconds (default: 1000)
  pub sink_delay_ms: u64,

  /// Buffer size of generator and sink channels (default: 1)
  pub channel_buffer: usize,

  /// Buffer size of the command queue (default: 32)
  pub command_buffer: usize,
}

impl Default for PoolConfig {
  fn default() -> Self {
    Self {
      initial_workers: 10,
      generator_interval_ms: 5000,
      generator_limit: 10000,
      sink_delay_ms: 1000,
      channel_buffer: 1,
      command_buffer: 32,
    }
  }
}

impl PoolConfig {
  pub fn generator_interval(&self) -> Duration {
    Duration::from_millis(self.generator_interval_ms)
  }

  pub fn sink_delay(&self) -> Duration {
    Duration::from_millis(self.sink_delay_ms)
  }
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Logging settings consumed by the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
  /// Log level: off, error, warn, info, debug, trace (default: info)
  pub level: String,

  /// Optional log file; console only when unset
  #[serde(skip_serializing_if = "Option::is_none")]
  pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
      file: None,
    }
  }
}

// ============================================================================
// Root Configuration
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub pipeline: PipelineConfig,

  #[serde(default)]
  pub signer: SignerConfig,

  #[serde(default)]
  pub pool: PoolConfig,

  #[serde(default)]
  pub logging: LoggingConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Failed to parse config {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },
}

impl Config {
  /// Load config from an explicit file. Unlike `load`, errors are reported.
  pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Load config for a working directory, with fallback to user config
  pub fn load(dir: &Path) -> Self {
    let local = dir.join(LOCAL_CONFIG_FILE);
    if local.exists()
      && let Ok(config) = Self::load_from(&local)
    {
      return config;
    }

    if let Some(user_config_path) = Self::user_config_path()
      && user_config_path.exists()
      && let Ok(config) = Self::load_from(&user_config_path)
    {
      return config;
    }

    Self::default()
  }

  /// Get the user-level config path
  pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("HASHPIPE_CONFIG_DIR") {
      return Some(PathBuf::from(path).join("config.toml"));
    }

    dirs::config_dir().map(|p: PathBuf| p.join("hashpipe").join("config.toml"))
  }
}
