//! Configuration loading for the clip recorder.
//!
//! # Usage
//!
//! ```rust,no_run
//! use clipconf::ClipConfig;
//!
//! let config = ClipConfig::load().expect("Failed to load config");
//! println!("recording into {}", config.paths.record_dir.display());
//! println!("storing into {}", config.paths.storage_dir.display());
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/cliprec/config.toml` (system)
//! 2. `~/.config/cliprec/config.toml` (user)
//! 3. `./cliprec.toml` (local override, or the explicit path given to `load_from`)
//! 4. Environment variables (`CLIPREC_*`)
//!
//! Files are merged table-by-table before deserializing, so a later file only
//! needs to mention the keys it changes.
//!
//! # Example Config
//!
//! ```toml
//! [paths]
//! record_dir = "~/.local/share/cliprec/recording"
//! storage_dir = "/tank/clips"
//! index_path = "/tank/clips/index.db"
//!
//! [capture]
//! record_width = 640
//! record_height = 360
//! fps_limit = 15
//! hw_accel_device = "vaapi"
//!
//! [capture.timestamps]
//! enabled = true
//! use_12hr_time = true
//!
//! [telemetry]
//! log_level = "debug"
//! ```

pub mod capture;
pub mod codec;
pub mod loader;
pub mod paths;

pub use capture::{CaptureConfig, TimestampConfig};
pub use codec::{CodecConfig, QualityProfile, CODEC_CONFIG_FILENAME};
pub use loader::{discover_config_files_with_override, expand_path, ConfigSources};
pub use paths::{PathsConfig, TelemetryConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete recorder configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClipConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl ClipConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration with an explicit file taking the place of `./cliprec.toml`.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let files = loader::discover_config_files_with_override(config_path);
        Self::load_files(&files)
    }

    /// Load and merge exactly the given files, then apply env overrides.
    pub fn load_files(files: &[PathBuf]) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut merged = toml::Table::new();

        for path in files {
            let table = loader::load_table(path)?;
            loader::merge_tables(&mut merged, table);
            sources.files.push(path.clone());
        }

        let mut config = loader::table_to_config(merged, files.last())?;
        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Parse a single TOML document on top of the compiled defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let path = Path::new("<inline>");
        let table = loader::parse_table(contents, path)?;
        loader::table_to_config(table, Some(&path.to_path_buf()))
    }

    /// Codec profile from `<config_dir>/output_config.toml`.
    pub fn codec(&self) -> Result<CodecConfig, ConfigError> {
        CodecConfig::load_from_dir(&self.paths.config_dir)
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::from("# Clip recorder configuration\n\n");
        match toml::to_string_pretty(self) {
            Ok(body) => output.push_str(&body),
            Err(e) => output.push_str(&format!("# failed to render config: {}\n", e)),
        }
        output
    }
}
