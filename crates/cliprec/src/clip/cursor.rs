use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use clipconf::TimestampConfig;

use crate::error::ClipError;
use crate::frame::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorMode {
    /// Monotonic stepping with `next_frame`/`prev_frame`.
    Sequential,
    /// Arbitrary `frame_at` lookups.
    Random,
}

/// Drawn on top of decoded frames at `ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub ms: i64,
    pub params: Vec<f64>,
}

/// Decoder options passed through at open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipOpenOptions {
    pub enable_audio: bool,
    pub async_read: bool,
    pub debug: bool,
    pub timestamps: TimestampConfig,
    pub keyframe_only: bool,
    pub audio_mute: bool,
    pub boxes: Vec<Overlay>,
    pub zones: Vec<Overlay>,
}

/// Everything needed to open one more handle on the same clip.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipOpenSpec {
    pub path: PathBuf,
    /// Requested output size; 0 keeps the input size.
    pub width: u32,
    pub height: u32,
    /// Clip's wall-clock start, added to frame offsets.
    pub start_ms: i64,
    pub options: ClipOpenOptions,
}

impl ClipOpenSpec {
    /// Spec for a short-lived metadata probe.
    pub fn probe(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            width: 0,
            height: 0,
            start_ms: 0,
            options: ClipOpenOptions::default(),
        }
    }
}

/// Opens decode handles on clip files.
pub trait ClipDecoder: Send + Sync {
    fn open(&self, spec: &ClipOpenSpec) -> Result<Box<dyn ClipCursor>, ClipError>;
}

/// One open decode position in a clip file.
pub trait ClipCursor {
    /// Tell the handle how it will be driven; called once, before first use.
    fn set_mode(&mut self, mode: CursorMode);

    fn next_frame(&mut self) -> Option<Frame>;

    fn prev_frame(&mut self) -> Option<Frame>;

    /// Decode the frame at (or nearest before) `ms`. Leaves the sequential
    /// position undefined.
    fn frame_at(&mut self, ms: i64) -> Option<Frame>;

    /// Position so that `next_frame` returns the first frame after `after_ms`;
    /// `None` rewinds to the first frame.
    fn seek(&mut self, after_ms: Option<i64>) -> bool;

    /// Offset of every frame, in ms.
    fn frame_offsets(&mut self) -> Option<Vec<i64>>;

    fn duration(&mut self) -> Option<i64>;

    /// Offset of the frame `next_frame` would return.
    fn next_frame_offset(&mut self) -> Option<i64>;

    fn has_audio(&self) -> bool;

    fn input_size(&self) -> Option<(u32, u32)>;

    fn set_mute(&mut self, mute: bool);

    fn set_output_size(&mut self, width: u32, height: u32);

    /// Release decoder resources. Must be safe to call more than once.
    fn close(&mut self);
}
