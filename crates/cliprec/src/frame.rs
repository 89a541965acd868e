use bytes::Bytes;

/// One decoded picture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    /// Presentation time in milliseconds.
    pub ms: i64,
}

impl Frame {
    pub fn new(data: impl Into<Bytes>, width: u32, height: u32, ms: i64) -> Self {
        Self {
            data: data.into(),
            width,
            height,
            ms,
        }
    }
}

/// A live frame plus the segment file the engine is writing when it was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    pub frame: Frame,
    /// Segment file name as reported by the engine; empty when not recording.
    pub filename: String,
}

/// Frame rates reported by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FpsInfo {
    /// Frames per second arriving from the source.
    pub received: f32,
    /// Frames per second handed to the caller.
    pub delivered: f32,
}
