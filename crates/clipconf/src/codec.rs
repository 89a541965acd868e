//! Encoder profile read from `output_config.toml`.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CODEC_CONFIG_FILENAME: &str = "output_config.toml";

/// Clip quality profile requested from the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityProfile {
    NotSpecified,
    Original,
    High,
    Medium,
    Low,
    Other(i32),
}

impl From<i32> for QualityProfile {
    fn from(value: i32) -> Self {
        match value {
            -1 => Self::NotSpecified,
            0 => Self::Original,
            10 => Self::High,
            20 => Self::Medium,
            30 => Self::Low,
            other => Self::Other(other),
        }
    }
}

impl From<QualityProfile> for i32 {
    fn from(profile: QualityProfile) -> Self {
        match profile {
            QualityProfile::NotSpecified => -1,
            QualityProfile::Original => 0,
            QualityProfile::High => 10,
            QualityProfile::Medium => 20,
            QualityProfile::Low => 30,
            QualityProfile::Other(v) => v,
        }
    }
}

/// Encoder parameters from the `[video]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Scales the encoder's target bit rate; 0 leaves it to the engine.
    #[serde(default)]
    pub bit_rate_multiplier: f64,
    #[serde(default)]
    pub max_bit_rate: i64,
    #[serde(default = "CodecConfig::default_gop_size")]
    pub gop_size: i32,
    #[serde(default = "CodecConfig::default_keyint_min")]
    pub keyint_min: i32,
    #[serde(default = "CodecConfig::default_preset")]
    pub preset: String,
    #[serde(default)]
    pub max_width: u32,
    #[serde(default)]
    pub max_height: u32,
    #[serde(default = "CodecConfig::default_sv_profile", rename = "sv_profile")]
    pub quality_profile: i32,
}

impl CodecConfig {
    fn default_gop_size() -> i32 {
        42
    }

    fn default_keyint_min() -> i32 {
        10
    }

    fn default_preset() -> String {
        "ultrafast".to_string()
    }

    fn default_sv_profile() -> i32 {
        -1
    }

    pub fn quality(&self) -> QualityProfile {
        QualityProfile::from(self.quality_profile)
    }

    /// Load `<dir>/output_config.toml`. A missing file or missing `[video]`
    /// section yields the defaults.
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CODEC_CONFIG_FILENAME);
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileRead {
            path: path.clone(),
            source: e,
        })?;
        Self::from_toml_str(&contents, &path)
    }

    fn from_toml_str(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let table = crate::loader::parse_table(contents, path)?;
        match table.get("video") {
            Some(video) => video
                .clone()
                .try_into()
                .map_err(|e: toml::de::Error| ConfigError::Parse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }),
            None => Ok(Self::default()),
        }
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            bit_rate_multiplier: 0.0,
            max_bit_rate: 0,
            gop_size: Self::default_gop_size(),
            keyint_min: Self::default_keyint_min(),
            preset: Self::default_preset(),
            max_width: 0,
            max_height: 0,
            quality_profile: Self::default_sv_profile(),
        }
    }
}
