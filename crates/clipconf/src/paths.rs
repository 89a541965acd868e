//! Filesystem locations and telemetry settings.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Filesystem paths used by the recorder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory the capture engine writes live segments into.
    /// Each location records into its own `<record_dir>/<location>` subdirectory.
    /// Default: ~/.local/share/cliprec/recording
    #[serde(default = "PathsConfig::default_record_dir")]
    pub record_dir: PathBuf,

    /// Permanent storage root for finished segments.
    /// Default: ~/.local/share/cliprec/clips
    #[serde(default = "PathsConfig::default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Directory searched for `output_config.toml`.
    /// Default: ~/.config/cliprec
    #[serde(default = "PathsConfig::default_config_dir")]
    pub config_dir: PathBuf,

    /// SQLite clip index.
    /// Default: ~/.local/share/cliprec/clips.db
    #[serde(default = "PathsConfig::default_index_path")]
    pub index_path: PathBuf,
}

fn data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".local/share/cliprec"))
        .unwrap_or_else(|| PathBuf::from(".local/share/cliprec"))
}

impl PathsConfig {
    fn default_record_dir() -> PathBuf {
        data_dir().join("recording")
    }

    fn default_storage_dir() -> PathBuf {
        data_dir().join("clips")
    }

    fn default_config_dir() -> PathBuf {
        directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("cliprec"))
            .unwrap_or_else(|| PathBuf::from(".config/cliprec"))
    }

    fn default_index_path() -> PathBuf {
        data_dir().join("clips.db")
    }

    /// Recording directory for one location.
    pub fn location_record_dir(&self, location: &str) -> PathBuf {
        self.record_dir.join(location)
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            record_dir: Self::default_record_dir(),
            storage_dir: Self::default_storage_dir(),
            config_dir: Self::default_config_dir(),
            index_path: Self::default_index_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter (trace, debug, info, warn, error, or a full EnvFilter directive).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths_share_data_dir() {
        let paths = PathsConfig::default();
        assert!(paths.record_dir.ends_with("cliprec/recording"));
        assert!(paths.storage_dir.ends_with("cliprec/clips"));
        assert!(paths.index_path.ends_with("cliprec/clips.db"));
    }

    #[test]
    fn test_location_record_dir() {
        let paths = PathsConfig {
            record_dir: PathBuf::from("/rec"),
            ..Default::default()
        };
        assert_eq!(
            paths.location_record_dir("front door"),
            PathBuf::from("/rec/front door")
        );
    }
}
