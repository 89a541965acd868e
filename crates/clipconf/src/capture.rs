//! Capture defaults handed to the frame source when a stream opens.

use serde::{Deserialize, Serialize};

/// Timestamp overlay options burned into recorded video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub use_12hr_time: bool,
    #[serde(default)]
    pub use_us_date: bool,
}

/// Per-stream capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Requested recording width. Default: 320
    #[serde(default = "CaptureConfig::default_record_width")]
    pub record_width: u32,

    /// Requested recording height. Default: 240
    #[serde(default = "CaptureConfig::default_record_height")]
    pub record_height: u32,

    /// Frame-rate limit. Default: 10
    #[serde(default = "CaptureConfig::default_fps_limit")]
    pub fps_limit: u32,

    /// Record the audio track. Default: true
    #[serde(default = "CaptureConfig::default_true")]
    pub record_audio: bool,

    /// Mute audio on playback.
    #[serde(default)]
    pub audio_mute: bool,

    /// Force RTSP over TCP.
    #[serde(default)]
    pub force_tcp: bool,

    /// Start the live view before the first keyframe arrives.
    #[serde(default)]
    pub fast_start: bool,

    /// Engine keeps segments in memory; relocation goes through the engine.
    #[serde(default)]
    pub record_in_memory: bool,

    /// Clip quality profile (-1 not specified, 0 original, 10 high, 20 medium, 30 low).
    #[serde(default = "CaptureConfig::default_quality_profile")]
    pub quality_profile: i32,

    /// Upper bound on output width; 0 = unbounded.
    #[serde(default)]
    pub max_output_width: u32,

    /// Upper bound on output height; 0 = unbounded.
    #[serde(default)]
    pub max_output_height: u32,

    /// Hardware decoder device; empty = software decode.
    #[serde(default)]
    pub hw_accel_device: String,

    #[serde(default)]
    pub timestamps: TimestampConfig,

    /// Seconds between timing-stat log lines; 0 disables them.
    #[serde(default)]
    pub stats_interval_secs: u64,
}

impl CaptureConfig {
    fn default_record_width() -> u32 {
        320
    }

    fn default_record_height() -> u32 {
        240
    }

    fn default_fps_limit() -> u32 {
        10
    }

    fn default_true() -> bool {
        true
    }

    fn default_quality_profile() -> i32 {
        -1
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            record_width: Self::default_record_width(),
            record_height: Self::default_record_height(),
            fps_limit: Self::default_fps_limit(),
            record_audio: true,
            audio_mute: false,
            force_tcp: false,
            fast_start: false,
            record_in_memory: false,
            quality_profile: Self::default_quality_profile(),
            max_output_width: 0,
            max_output_height: 0,
            hw_accel_device: String::new(),
            timestamps: TimestampConfig::default(),
            stats_interval_secs: 0,
        }
    }
}
