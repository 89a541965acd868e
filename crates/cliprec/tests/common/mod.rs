//! Scripted stand-ins for the capture engine, the clip decoder and the index.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use clipconf::ClipConfig;
use cliprec::{
    CaptureError, CaptureStream, CapturedFrame, ClipCursor, ClipDecoder, ClipError, ClipIndex,
    ClipOpenSpec, ClipRecord, CursorMode, Frame, FrameSource, IndexError, OpenRequest,
};

/// Config rooted in a scratch directory.
pub fn test_config(root: &Path) -> ClipConfig {
    let mut config = ClipConfig::default();
    config.paths.record_dir = root.join("rec");
    config.paths.storage_dir = root.join("store");
    config.paths.config_dir = root.join("conf");
    config.paths.index_path = root.join("store/clips.db");
    config
}

pub fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

// ---------------------------------------------------------------------------
// Capture engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Step {
    Frame(&'static str, i64),
    Idle,
    Stop,
}

/// Counters shared between the fake engine and its streams.
#[derive(Debug, Default)]
pub struct EngineProbe {
    pub opens: AtomicUsize,
    pub flushes: AtomicUsize,
    pub closes: AtomicUsize,
    pub requests: Mutex<Vec<OpenRequest>>,
    pub hw_device: Mutex<Option<String>>,
    pub engine_moves: Mutex<Vec<(PathBuf, PathBuf)>>,
}

pub struct FakeSource {
    pub probe: Arc<EngineProbe>,
    script: Mutex<Vec<Step>>,
    fail_open: bool,
}

impl FakeSource {
    pub fn new(script: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            probe: Arc::new(EngineProbe::default()),
            script: Mutex::new(script),
            fail_open: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            probe: Arc::new(EngineProbe::default()),
            script: Mutex::new(Vec::new()),
            fail_open: true,
        })
    }

    pub fn frames(names: &[(&'static str, i64)]) -> Arc<Self> {
        Self::new(names.iter().map(|(n, ms)| Step::Frame(n, *ms)).collect())
    }
}

impl FrameSource for FakeSource {
    fn open(&self, request: &OpenRequest) -> Result<Box<dyn CaptureStream>, CaptureError> {
        self.probe.requests.lock().unwrap().push(request.clone());
        if self.fail_open {
            return Err(CaptureError::OpenFailed {
                uri: request.sanitized_uri.clone(),
                reason: "connection refused".to_string(),
            });
        }
        self.probe.opens.fetch_add(1, Ordering::SeqCst);
        let steps = std::mem::take(&mut *self.script.lock().unwrap());
        Ok(Box::new(FakeStream {
            probe: self.probe.clone(),
            steps: steps.into(),
            record_dir: request.record_dir.clone(),
            running: true,
        }))
    }

    fn set_hw_device(&self, device: &str) {
        *self.probe.hw_device.lock().unwrap() = Some(device.to_string());
    }

    fn move_recorded_file(&self, src: &Path, dst: &Path) -> Result<(), CaptureError> {
        self.probe
            .engine_moves
            .lock()
            .unwrap()
            .push((src.to_path_buf(), dst.to_path_buf()));
        fs::rename(src, dst).map_err(|e| CaptureError::Engine(e.to_string()))
    }
}

pub struct FakeStream {
    probe: Arc<EngineProbe>,
    steps: VecDeque<Step>,
    record_dir: PathBuf,
    running: bool,
}

impl CaptureStream for FakeStream {
    fn poll_frame(&mut self, _want_large_view: bool) -> Option<CapturedFrame> {
        match self.steps.pop_front()? {
            Step::Frame(name, ms) => {
                // The engine appends each frame to its current segment file.
                let mut file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(self.record_dir.join(name))
                    .unwrap();
                writeln!(file, "{ms}").unwrap();
                Some(CapturedFrame {
                    frame: Frame::new(Bytes::from(vec![0u8; 4]), 320, 240, ms),
                    filename: name.to_string(),
                })
            }
            Step::Idle => None,
            Step::Stop => {
                self.running = false;
                None
            }
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn flush(&mut self) {
        self.probe.flushes.fetch_add(1, Ordering::SeqCst);
    }

    fn close(&mut self) {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn proc_size(&self) -> Option<(u32, u32)> {
        Some((320, 240))
    }

    fn initial_frame_buffer_size(&self) -> usize {
        3
    }
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

/// Records commits and tracks whether two ever overlapped.
#[derive(Default)]
pub struct RecordingIndex {
    pub records: Mutex<Vec<ClipRecord>>,
    active: AtomicUsize,
    pub peak_concurrency: AtomicUsize,
    pub delay: Option<Duration>,
}

impl RecordingIndex {
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Default::default()
        })
    }

    pub fn records(&self) -> Vec<ClipRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

impl ClipIndex for RecordingIndex {
    fn commit(&self, record: &ClipRecord) -> Result<(), IndexError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_concurrency.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        self.records.lock().unwrap().push(record.clone());
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Clip decoder
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct DecoderProbe {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub sequential_seeks: AtomicUsize,
    pub duration_calls: AtomicUsize,
    pub mute_calls: AtomicUsize,
    pub resize_calls: AtomicUsize,
    pub modes: Mutex<Vec<CursorMode>>,
}

/// Decoder serving a clip whose frames sit at fixed offsets.
pub struct FakeDecoder {
    pub probe: Arc<DecoderProbe>,
    offsets: Vec<i64>,
}

impl FakeDecoder {
    /// Frames every 100 ms, `count` of them.
    pub fn new(count: usize) -> Arc<Self> {
        Arc::new(Self {
            probe: Arc::new(DecoderProbe::default()),
            offsets: (0..count as i64).map(|i| i * 100).collect(),
        })
    }
}

impl ClipDecoder for FakeDecoder {
    fn open(&self, spec: &ClipOpenSpec) -> Result<Box<dyn ClipCursor>, ClipError> {
        if spec.path.file_name().is_some_and(|n| n == "missing.mp4") {
            return Err(ClipError::OpenFailed {
                path: spec.path.clone(),
                reason: "no such file".to_string(),
            });
        }
        self.probe.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeCursor {
            probe: self.probe.clone(),
            offsets: self.offsets.clone(),
            start_ms: spec.start_ms,
            mode: None,
            current: None,
            closed: false,
        }))
    }
}

pub struct FakeCursor {
    probe: Arc<DecoderProbe>,
    offsets: Vec<i64>,
    start_ms: i64,
    mode: Option<CursorMode>,
    /// Index of the last frame delivered; `Some(len)` once past the end.
    current: Option<usize>,
    closed: bool,
}

impl FakeCursor {
    fn frame(&self, idx: usize) -> Frame {
        Frame::new(Bytes::from_static(b"px"), 320, 240, self.start_ms + self.offsets[idx])
    }

    /// Last frame at or before `ms`.
    fn index_at(&self, ms: i64) -> Option<usize> {
        self.offsets
            .iter()
            .rposition(|off| self.start_ms + off <= ms)
    }
}

impl ClipCursor for FakeCursor {
    fn set_mode(&mut self, mode: CursorMode) {
        self.mode = Some(mode);
        self.probe.modes.lock().unwrap().push(mode);
    }

    fn next_frame(&mut self) -> Option<Frame> {
        let idx = self.current.map_or(0, |c| c + 1);
        if idx < self.offsets.len() {
            self.current = Some(idx);
            Some(self.frame(idx))
        } else {
            self.current = Some(self.offsets.len());
            None
        }
    }

    fn prev_frame(&mut self) -> Option<Frame> {
        let idx = self.current?.checked_sub(1)?;
        self.current = Some(idx);
        Some(self.frame(idx))
    }

    fn frame_at(&mut self, ms: i64) -> Option<Frame> {
        let idx = self.index_at(ms).unwrap_or(0);
        self.current = Some(idx);
        Some(self.frame(idx))
    }

    fn seek(&mut self, after_ms: Option<i64>) -> bool {
        if self.mode == Some(CursorMode::Sequential) {
            self.probe.sequential_seeks.fetch_add(1, Ordering::SeqCst);
        }
        self.current = after_ms.and_then(|ms| self.index_at(ms));
        true
    }

    fn frame_offsets(&mut self) -> Option<Vec<i64>> {
        Some(self.offsets.clone())
    }

    fn duration(&mut self) -> Option<i64> {
        self.probe.duration_calls.fetch_add(1, Ordering::SeqCst);
        self.offsets.last().map(|last| last + 100)
    }

    fn next_frame_offset(&mut self) -> Option<i64> {
        let idx = self.current.map_or(0, |c| c + 1);
        self.offsets.get(idx).copied()
    }

    fn has_audio(&self) -> bool {
        true
    }

    fn input_size(&self) -> Option<(u32, u32)> {
        Some((1280, 720))
    }

    fn set_mute(&mut self, _mute: bool) {
        self.probe.mute_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn set_output_size(&mut self, _width: u32, _height: u32) {
        self.probe.resize_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.probe.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}
