//! Clip index seam and an in-memory implementation.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::segment::Segment;

/// Metadata committed for each relocated segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipRecord {
    /// Storage-relative path (`<location>/<prefix>/<file>`).
    pub path: String,
    pub location_name: String,
    pub start_ms: i64,
    pub end_ms: i64,
    pub prev_path: String,
    pub width: u32,
    pub height: u32,
}

impl ClipRecord {
    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }
}

impl From<&Segment> for ClipRecord {
    fn from(segment: &Segment) -> Self {
        Self {
            path: segment.storage_path(),
            location_name: segment.location_name.clone(),
            start_ms: segment.start_ms,
            end_ms: segment.end_ms,
            prev_path: segment.prev_path.clone(),
            width: segment.width,
            height: segment.height,
        }
    }
}

/// Where finished clips are registered. Called from the mover thread.
pub trait ClipIndex: Send + Sync {
    fn commit(&self, record: &ClipRecord) -> Result<(), IndexError>;
}

/// Commit-ordered in-memory index.
#[derive(Debug, Default)]
pub struct MemoryClipIndex {
    records: Mutex<Vec<ClipRecord>>,
}

impl MemoryClipIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every commit so far, oldest first.
    pub fn records(&self) -> Vec<ClipRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn list(&self, location_name: &str) -> Vec<ClipRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.location_name == location_name)
            .collect()
    }

    pub fn get(&self, path: &str) -> Option<ClipRecord> {
        self.records().into_iter().find(|r| r.path == path)
    }
}

impl ClipIndex for MemoryClipIndex {
    fn commit(&self, record: &ClipRecord) -> Result<(), IndexError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| IndexError::Unavailable("memory index lock poisoned".to_string()))?;
        records.push(record.clone());
        Ok(())
    }
}
