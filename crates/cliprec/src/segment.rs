//! Segment bookkeeping: noticing engine rollovers and naming the files.

use serde::{Deserialize, Serialize};

/// Characters of the file name used for the storage subdirectory.
const DIR_PREFIX_LEN: usize = 5;

/// One on-disk segment file produced during a continuous capture run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// File name as reported by the engine.
    pub file_name: String,
    /// Storage subdirectory, `<location>/<prefix>` lower-cased.
    pub dir: String,
    pub location_name: String,
    pub start_ms: i64,
    pub end_ms: i64,
    /// Path of the segment recorded before this one; empty for the first.
    pub prev_path: String,
    pub width: u32,
    pub height: u32,
}

impl Segment {
    pub fn new(location_name: &str, file_name: &str, start_ms: i64, prev_path: String) -> Self {
        Self {
            file_name: file_name.to_string(),
            dir: storage_dir_for(location_name, file_name),
            location_name: location_name.to_string(),
            start_ms,
            end_ms: start_ms,
            prev_path,
            width: 0,
            height: 0,
        }
    }

    /// `<dir>/<file name>` as reported; used for failure reports and chaining.
    pub fn logical_path(&self) -> String {
        format!("{}/{}", self.dir, self.file_name)
    }

    /// Relative path the segment is stored and indexed under.
    pub fn storage_path(&self) -> String {
        format!("{}/{}", self.dir, self.file_name.to_lowercase())
    }
}

/// `<location>/<first five chars of file name>`, lower-cased.
pub fn storage_dir_for(location_name: &str, file_name: &str) -> String {
    let prefix: String = file_name.chars().take(DIR_PREFIX_LEN).collect();
    format!("{}/{}", location_name, prefix).to_lowercase()
}

/// Watches the file name the engine reports on each frame.
#[derive(Debug, Clone)]
pub struct SegmentTracker {
    location_name: String,
    current: Option<Segment>,
}

impl SegmentTracker {
    pub fn new(location_name: impl Into<String>) -> Self {
        Self {
            location_name: location_name.into(),
            current: None,
        }
    }

    /// Record one frame. Returns the segment that just ended when `file_name`
    /// differs from the one seen on the previous frame.
    pub fn observe(&mut self, file_name: &str, ms: i64) -> Option<Segment> {
        if let Some(current) = self.current.as_mut() {
            if current.file_name == file_name {
                current.end_ms = ms;
                return None;
            }
        }

        let finished = self.current.take();
        let prev_path = finished
            .as_ref()
            .map(Segment::logical_path)
            .unwrap_or_default();
        self.current = Some(Segment::new(&self.location_name, file_name, ms, prev_path));
        finished
    }

    /// End the run; returns the in-progress segment, if any.
    pub fn finish(&mut self) -> Option<Segment> {
        self.current.take()
    }

    pub fn current(&self) -> Option<&Segment> {
        self.current.as_ref()
    }

    pub fn current_start_ms(&self) -> Option<i64> {
        self.current.as_ref().map(|s| s.start_ms)
    }
}
