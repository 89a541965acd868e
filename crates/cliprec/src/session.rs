//! Stream session: polling a live stream and rotating its segments into storage.
//!
//! Close always runs the same sequence, whether the caller asked for it or
//! the engine stopped on its own:
//!
//! 1. flush pending engine output
//! 2. mark not running
//! 3. close the capture stream
//! 4. hand the in-progress segment to the mover
//! 5. wait for the mover to finish
//! 6. reset session state

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clipconf::{CaptureConfig, ClipConfig, CodecConfig};
use tracing::{debug, info, warn};

use crate::frame::{FpsInfo, Frame};
use crate::index::ClipIndex;
use crate::mover::{MoveFailedCallback, MoveJob, MoveOutcome, SegmentMover};
use crate::relocate::Relocator;
use crate::segment::{Segment, SegmentTracker};
use crate::source::{
    fix_blank_password, sanitize_uri, timestamp_flags, CaptureStream, FrameSource, OpenFlags,
    OpenRequest,
};
use crate::stats::TimingStat;

const GET_FRAME_SOFT_LIMIT: Duration = Duration::from_millis(50);
const MOVE_SOFT_LIMIT: Duration = Duration::from_secs(2);
const ADD_SOFT_LIMIT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Running,
    Closing,
}

/// Per-open choices that are not part of the persistent capture config.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Record segments to disk. Non-recording sessions track no segments.
    pub record: bool,
    pub live_stream: bool,
    pub edge_thread: bool,
    pub render_audio: bool,
    pub debug_clips: bool,
    pub show_regions: bool,
    pub simulation: bool,
    pub initial_frame_buffer_size: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            record: true,
            live_stream: true,
            edge_thread: false,
            render_audio: false,
            debug_clips: false,
            show_regions: false,
            simulation: false,
            initial_frame_buffer_size: 0,
        }
    }
}

/// Build the engine flags for one open.
pub fn open_flags(capture: &CaptureConfig, options: &StreamOptions) -> OpenFlags {
    let mut flags = OpenFlags::default();
    flags.set(OpenFlags::WANT_TCP, capture.force_tcp);
    flags.set(OpenFlags::SHOULD_RECORD, options.record);
    flags.set(OpenFlags::LIVE_STREAM, options.live_stream);
    flags.set(OpenFlags::ENABLE_TIMESTAMP, capture.timestamps.enabled);
    flags.set(OpenFlags::EDGE_THREAD, options.edge_thread);
    flags.set(OpenFlags::RENDER_AUDIO, options.render_audio);
    flags.set(OpenFlags::DEBUG_CLIPS, options.debug_clips);
    flags.set(OpenFlags::LIMIT_FPS, capture.fps_limit > 0);
    flags.set(OpenFlags::DISABLE_AUDIO, !capture.record_audio);
    flags.set(OpenFlags::SHOW_REGIONS, options.show_regions);
    flags.set(OpenFlags::FAST_START, capture.fast_start);
    flags.set(OpenFlags::RECORD_IN_MEMORY, capture.record_in_memory);
    flags.set(OpenFlags::SIMULATION, options.simulation);
    flags
}

/// Owns one capture stream and the rotation of its segment files.
///
/// Single-threaded: every method runs on the polling thread. Only the mover's
/// worker runs elsewhere, and it sees nothing but submitted [`MoveJob`]s.
pub struct StreamSession {
    source: Arc<dyn FrameSource>,
    index: Arc<dyn ClipIndex>,
    location_name: String,
    record_dir: PathBuf,
    storage_dir: PathBuf,
    capture: CaptureConfig,
    codec: CodecConfig,

    state: SessionState,
    stream: Option<Box<dyn CaptureStream>>,
    record: bool,
    tracker: SegmentTracker,
    mover: SegmentMover,
    on_move_failed: Option<MoveFailedCallback>,
    proc_size: Option<(u32, u32)>,

    get_frame_stat: TimingStat,
    move_stat: TimingStat,
    add_stat: TimingStat,
    stats_interval: Option<Duration>,
    last_stats_log: Instant,
}

impl StreamSession {
    pub fn new(
        source: Arc<dyn FrameSource>,
        index: Arc<dyn ClipIndex>,
        config: &ClipConfig,
        location_name: &str,
    ) -> Self {
        let codec = config.codec().unwrap_or_else(|e| {
            warn!(error = %e, "using default codec profile");
            CodecConfig::default()
        });

        let record_dir = config.paths.location_record_dir(location_name);
        if let Err(e) = std::fs::create_dir_all(&record_dir) {
            debug!(dir = %record_dir.display(), error = %e, "could not create record dir");
        }

        let stats_interval = match config.capture.stats_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Self {
            source,
            index,
            location_name: location_name.to_string(),
            record_dir,
            storage_dir: config.paths.storage_dir.clone(),
            capture: config.capture.clone(),
            codec,
            state: SessionState::Closed,
            stream: None,
            record: false,
            tracker: SegmentTracker::new(location_name),
            mover: SegmentMover::new(location_name),
            on_move_failed: None,
            proc_size: None,
            get_frame_stat: TimingStat::new("get_frame", GET_FRAME_SOFT_LIMIT),
            move_stat: TimingStat::new("move_clip", MOVE_SOFT_LIMIT),
            add_stat: TimingStat::new("add_clip", ADD_SOFT_LIMIT),
            stats_interval,
            last_stats_log: Instant::now(),
        }
    }

    /// Register the callback fired (on the mover thread) when a segment
    /// cannot be relocated. Applies to segments finalized afterwards.
    pub fn set_move_failed_callback(&mut self, callback: MoveFailedCallback) {
        self.on_move_failed = Some(callback);
    }

    pub fn location_name(&self) -> &str {
        &self.location_name
    }

    pub fn record_dir(&self) -> &PathBuf {
        &self.record_dir
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    /// Build the request handed to the engine for `uri`.
    pub fn open_request(&self, uri: &str, options: &StreamOptions) -> OpenRequest {
        let uri = fix_blank_password(uri);
        OpenRequest {
            sanitized_uri: sanitize_uri(&uri),
            uri,
            record_width: self.capture.record_width,
            record_height: self.capture.record_height,
            fps: self.capture.fps_limit,
            record_dir: self.record_dir.clone(),
            codec: self.codec.clone(),
            initial_frame_buffer_size: options.initial_frame_buffer_size,
            timestamp_flags: timestamp_flags(&self.capture.timestamps),
            flags: open_flags(&self.capture, options),
        }
    }

    /// Start streaming. An already-running session is closed first.
    /// Returns false, staying closed, when the engine cannot open the stream.
    pub fn open(&mut self, uri: &str, options: StreamOptions) -> bool {
        if self.state != SessionState::Closed {
            self.close();
        }

        let request = self.open_request(uri, &options);
        if !self.capture.hw_accel_device.is_empty() {
            self.source.set_hw_device(&self.capture.hw_accel_device);
        }

        match self.source.open(&request) {
            Ok(stream) => {
                info!(
                    location = %self.location_name,
                    uri = %request.sanitized_uri,
                    record = options.record,
                    "stream opened"
                );
                self.proc_size = stream.proc_size();
                self.stream = Some(stream);
                self.record = options.record;
                self.state = SessionState::Running;
                self.last_stats_log = Instant::now();
                true
            }
            Err(e) => {
                warn!(location = %self.location_name, error = %e, "failed to open stream");
                false
            }
        }
    }

    /// Newest frame since the previous poll, or `None`.
    ///
    /// If the engine reports it has stopped, the session closes itself
    /// (finalizing and storing the current segment) and returns `None`.
    pub fn poll_frame(&mut self, want_large_view: bool) -> Option<Frame> {
        if self.state != SessionState::Running {
            return None;
        }

        let started = Instant::now();
        let (polled, running, size) = {
            let stream = self.stream.as_mut()?;
            let polled = stream.poll_frame(want_large_view);
            (polled, stream.is_running(), stream.proc_size())
        };
        self.get_frame_stat.add(started.elapsed());

        if let Some(outcome) = self.mover.try_reap() {
            self.record_outcome(&outcome);
        }

        if !running {
            info!(location = %self.location_name, "stream stopped, closing session");
            self.close();
            return None;
        }

        if size.is_some() {
            self.proc_size = size;
        }

        let captured = polled?;
        if self.record && !captured.filename.is_empty() {
            if let Some(finished) = self.tracker.observe(&captured.filename, captured.frame.ms) {
                self.finalize(finished);
            }
        }

        self.maybe_log_stats();
        Some(captured.frame)
    }

    /// Make buffered segment output readable.
    ///
    /// With `ms_needed`, only flush when that time falls at or after the
    /// current segment's start; earlier times live in segments already
    /// rolled past.
    pub fn flush(&mut self, ms_needed: Option<i64>) {
        if let (Some(ms), Some(start)) = (ms_needed, self.tracker.current_start_ms()) {
            if ms < start {
                debug!(ms, start, "flush skipped, time is before current segment");
                return;
            }
        }
        if let Some(stream) = self.stream.as_mut() {
            stream.flush();
        }
    }

    /// Full-resolution copy of the latest frame, when the engine keeps one.
    pub fn large_frame(&mut self) -> Option<Frame> {
        self.stream.as_mut()?.large_frame()
    }

    /// Processing size; the last known value is kept after the stream stops.
    pub fn proc_size(&self) -> Option<(u32, u32)> {
        match &self.stream {
            Some(stream) if self.state == SessionState::Running => {
                stream.proc_size().or(self.proc_size)
            }
            _ => self.proc_size,
        }
    }

    pub fn fps_info(&self) -> FpsInfo {
        self.stream
            .as_ref()
            .map(|s| s.fps_info())
            .unwrap_or_default()
    }

    /// 0 when not running.
    pub fn initial_frame_buffer_size(&self) -> usize {
        match &self.stream {
            Some(stream) if self.state == SessionState::Running => {
                stream.initial_frame_buffer_size()
            }
            _ => 0,
        }
    }

    /// Close the session. A no-op when already closed.
    pub fn close(&mut self) {
        self.close_inner(None::<fn()>);
    }

    /// Close, running `killable` after the last segment is stored and before
    /// session state is reset.
    pub fn close_with(&mut self, killable: impl FnOnce()) {
        self.close_inner(Some(killable));
    }

    fn close_inner<F: FnOnce()>(&mut self, killable: Option<F>) {
        if self.state == SessionState::Closed {
            return;
        }

        if let Some(stream) = self.stream.as_mut() {
            stream.flush();
        }
        self.state = SessionState::Closing;

        if let Some(mut stream) = self.stream.take() {
            if let Some(size) = stream.proc_size() {
                self.proc_size = Some(size);
            }
            stream.close();
        }

        if let Some(last) = self.tracker.finish() {
            self.finalize(last);
        }
        if let Some(outcome) = self.mover.drain() {
            self.record_outcome(&outcome);
        }

        if let Some(killable) = killable {
            killable();
        }

        self.maybe_log_stats();
        self.reset();
        info!(location = %self.location_name, "session closed");
    }

    fn reset(&mut self) {
        self.tracker = SegmentTracker::new(self.location_name.clone());
        self.record = false;
        self.state = SessionState::Closed;
    }

    fn finalize(&mut self, mut segment: Segment) {
        if let Some((width, height)) = self.proc_size {
            segment.width = width;
            segment.height = height;
        }
        debug!(
            path = %segment.logical_path(),
            start_ms = segment.start_ms,
            end_ms = segment.end_ms,
            "segment finished"
        );

        let relocator = if self.capture.record_in_memory {
            Relocator::Engine(self.source.clone())
        } else {
            Relocator::Filesystem
        };
        let job = MoveJob {
            segment,
            record_dir: self.record_dir.clone(),
            storage_dir: self.storage_dir.clone(),
            index: self.index.clone(),
            relocator,
            on_failed: self.on_move_failed.clone(),
        };
        if let Some(outcome) = self.mover.submit(job) {
            self.record_outcome(&outcome);
        }
    }

    fn record_outcome(&mut self, outcome: &MoveOutcome) {
        self.move_stat.add(outcome.move_time);
        if outcome.committed {
            self.add_stat.add(outcome.add_time);
        }
    }

    fn maybe_log_stats(&mut self) {
        let Some(interval) = self.stats_interval else {
            return;
        };
        if self.last_stats_log.elapsed() < interval {
            return;
        }
        for stat in [&mut self.get_frame_stat, &mut self.move_stat, &mut self.add_stat] {
            if stat.count() > 0 {
                info!(location = %self.location_name, "{}", stat);
            }
            stat.reset();
        }
        self.last_stats_log = Instant::now();
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_flags_from_config() {
        let mut capture = CaptureConfig::default();
        capture.force_tcp = true;
        capture.record_audio = false;
        capture.record_in_memory = true;

        let flags = open_flags(&capture, &StreamOptions::default());
        assert!(flags.contains(OpenFlags::WANT_TCP));
        assert!(flags.contains(OpenFlags::SHOULD_RECORD));
        assert!(flags.contains(OpenFlags::LIVE_STREAM));
        assert!(flags.contains(OpenFlags::LIMIT_FPS));
        assert!(flags.contains(OpenFlags::DISABLE_AUDIO));
        assert!(flags.contains(OpenFlags::RECORD_IN_MEMORY));
        assert!(!flags.contains(OpenFlags::ENABLE_TIMESTAMP));
        assert!(!flags.contains(OpenFlags::SIMULATION));
    }

    #[test]
    fn test_non_recording_open_drops_record_flag() {
        let options = StreamOptions {
            record: false,
            ..Default::default()
        };
        let flags = open_flags(&CaptureConfig::default(), &options);
        assert!(!flags.contains(OpenFlags::SHOULD_RECORD));
    }
}
