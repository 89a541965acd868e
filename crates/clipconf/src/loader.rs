//! Config file discovery, table merging, and environment variable overlay.

use crate::{ClipConfig, ConfigError};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli). Only existing files are returned.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/cliprec/config.toml");
    if system.exists() {
        files.push(system);
    }

    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("cliprec/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("cliprec.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read and parse one file into a raw TOML table.
pub fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_table(&contents, path)
}

pub fn parse_table(contents: &str, path: &Path) -> Result<toml::Table, ConfigError> {
    contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Deep-merge `overlay` into `base`. Nested tables merge key by key; any other
/// value in `overlay` replaces the one in `base`.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Expand `~` and `$VAR` in every string under `[paths]`, then deserialize.
pub fn table_to_config(
    mut table: toml::Table,
    origin: Option<&PathBuf>,
) -> Result<ClipConfig, ConfigError> {
    if let Some(toml::Value::Table(paths)) = table.get_mut("paths") {
        for (_, value) in paths.iter_mut() {
            if let toml::Value::String(s) = value {
                *s = expand_path(s).to_string_lossy().into_owned();
            }
        }
    }

    let config: ClipConfig = toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: origin.cloned().unwrap_or_else(|| PathBuf::from("<merged>")),
            message: e.to_string(),
        })?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &ClipConfig) -> Result<(), ConfigError> {
    let capture = &config.capture;
    if capture.record_width == 0 || capture.record_height == 0 {
        return Err(ConfigError::Invalid(format!(
            "capture.record_width/record_height must be non-zero, got {}x{}",
            capture.record_width, capture.record_height
        )));
    }
    Ok(())
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut ClipConfig, sources: &mut ConfigSources) {
    // Paths
    if let Ok(v) = env::var("CLIPREC_RECORD_DIR") {
        config.paths.record_dir = expand_path(&v);
        sources.env_overrides.push("CLIPREC_RECORD_DIR".to_string());
    }
    if let Ok(v) = env::var("CLIPREC_STORAGE_DIR") {
        config.paths.storage_dir = expand_path(&v);
        sources.env_overrides.push("CLIPREC_STORAGE_DIR".to_string());
    }
    if let Ok(v) = env::var("CLIPREC_CONFIG_DIR") {
        config.paths.config_dir = expand_path(&v);
        sources.env_overrides.push("CLIPREC_CONFIG_DIR".to_string());
    }
    if let Ok(v) = env::var("CLIPREC_INDEX_PATH") {
        config.paths.index_path = expand_path(&v);
        sources.env_overrides.push("CLIPREC_INDEX_PATH".to_string());
    }

    // Capture
    if let Ok(v) = env::var("CLIPREC_FPS_LIMIT") {
        if let Ok(fps) = v.parse() {
            config.capture.fps_limit = fps;
            sources.env_overrides.push("CLIPREC_FPS_LIMIT".to_string());
        }
    }
    if let Ok(v) = env::var("CLIPREC_HW_DEVICE") {
        config.capture.hw_accel_device = v;
        sources.env_overrides.push("CLIPREC_HW_DEVICE".to_string());
    }
    if let Ok(v) = env::var("CLIPREC_RECORD_IN_MEMORY") {
        if let Some(flag) = parse_bool(&v) {
            config.capture.record_in_memory = flag;
            sources.env_overrides.push("CLIPREC_RECORD_IN_MEMORY".to_string());
        }
    }
    if let Ok(v) = env::var("CLIPREC_STATS_INTERVAL") {
        if let Ok(secs) = v.parse() {
            config.capture.stats_interval_secs = secs;
            sources.env_overrides.push("CLIPREC_STATS_INTERVAL".to_string());
        }
    }

    // Telemetry
    if let Ok(v) = env::var("CLIPREC_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("CLIPREC_LOG_LEVEL".to_string());
    }
    if let Ok(v) = env::var("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        match directories::BaseDirs::new() {
            Some(dirs) => dirs.home_dir().join(stripped),
            None => PathBuf::from(path),
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // $VAR/rest/of/path
        match stripped.find('/') {
            Some(slash) => match env::var(&stripped[..slash]) {
                Ok(value) => PathBuf::from(value).join(&stripped[slash + 1..]),
                Err(_) => PathBuf::from(path),
            },
            None => env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path)),
        }
    } else {
        PathBuf::from(path)
    }
}
