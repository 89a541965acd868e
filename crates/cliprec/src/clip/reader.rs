use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use super::cursor::{ClipDecoder, ClipOpenOptions, ClipOpenSpec};
use super::pair::ClipCursorPair;
use crate::frame::Frame;

/// Client-facing playback over one clip.
///
/// Tracks the last timestamp delivered to the caller (`prev_ms`) separately
/// from where the sequential cursor actually is (`cursor_ms`). When they
/// differ, because of a seek or an external [`set_prev_ms`](Self::set_prev_ms),
/// the next step reseeks the sequential cursor before advancing.
pub struct ClipReader {
    decoder: Arc<dyn ClipDecoder>,
    pair: Option<ClipCursorPair>,
    path: PathBuf,
    requested_size: (u32, u32),
    first_ms: i64,
    mute: bool,

    prev_ms: Option<i64>,
    cursor_ms: Option<i64>,
    force_reseek: bool,
    done: bool,

    duration: Option<i64>,
    frame_offsets: Option<Vec<i64>>,
}

impl ClipReader {
    pub fn new(decoder: Arc<dyn ClipDecoder>) -> Self {
        Self {
            decoder,
            pair: None,
            path: PathBuf::new(),
            requested_size: (0, 0),
            first_ms: 0,
            mute: false,
            prev_ms: None,
            cursor_ms: None,
            force_reseek: false,
            done: false,
            duration: None,
            frame_offsets: None,
        }
    }

    /// Open `path`, replacing any clip already open. Returns false and stays
    /// unopened when the decoder rejects the file.
    pub fn open(
        &mut self,
        path: &Path,
        width: u32,
        height: u32,
        start_ms: i64,
        options: ClipOpenOptions,
    ) -> bool {
        self.close();

        self.mute = options.audio_mute;
        let spec = ClipOpenSpec {
            path: path.to_path_buf(),
            width,
            height,
            start_ms,
            options,
        };
        match ClipCursorPair::open(self.decoder.clone(), spec) {
            Ok(pair) => {
                debug!(path = %path.display(), "clip opened");
                self.pair = Some(pair);
                self.path = path.to_path_buf();
                self.requested_size = (width, height);
                self.first_ms = start_ms;
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to open clip");
                false
            }
        }
    }

    /// Release every handle and forget all position and cached metadata.
    pub fn close(&mut self) {
        if let Some(mut pair) = self.pair.take() {
            pair.close();
        }
        self.prev_ms = None;
        self.cursor_ms = None;
        self.force_reseek = false;
        self.done = false;
        self.duration = None;
        self.frame_offsets = None;
    }

    pub fn is_open(&self) -> bool {
        self.pair.is_some()
    }

    /// Next frame in order. `None` at end of clip, after which the reader
    /// stays done until a seek, a backward step, or `set_prev_ms`.
    pub fn next_frame(&mut self) -> Option<Frame> {
        if self.done {
            return None;
        }
        self.step(true)
    }

    /// Previous frame. Valid after end of clip; clears the done flag.
    /// At the start of the clip returns `None` and forgets the position,
    /// leaving the done flag as it was.
    pub fn prev_frame(&mut self) -> Option<Frame> {
        let frame = self.step(false)?;
        self.done = false;
        Some(frame)
    }

    fn step(&mut self, forward: bool) -> Option<Frame> {
        let prev_ms = self.prev_ms;
        let diverged = self.force_reseek || prev_ms != self.cursor_ms;
        let cursor = self.pair.as_mut()?.sequential()?;

        if diverged {
            debug!(?prev_ms, "resyncing sequential cursor");
            if !cursor.seek(prev_ms) {
                warn!(path = %self.path.display(), ?prev_ms, "sequential reseek failed");
                return None;
            }
            self.cursor_ms = prev_ms;
            self.force_reseek = false;
        }

        let frame = if forward {
            cursor.next_frame()
        } else {
            cursor.prev_frame()
        };

        match frame {
            Some(frame) => {
                self.prev_ms = Some(frame.ms);
                self.cursor_ms = Some(frame.ms);
                Some(frame)
            }
            None => {
                if forward {
                    self.done = true;
                }
                self.prev_ms = None;
                self.cursor_ms = None;
                None
            }
        }
    }

    /// Jump to `ms` using the random cursor. The next `next_frame` continues
    /// from the returned frame.
    pub fn seek(&mut self, ms: i64) -> Option<Frame> {
        let frame = self.pair.as_mut()?.random()?.frame_at(ms)?;
        self.prev_ms = Some(frame.ms);
        self.done = false;
        Some(frame)
    }

    /// Frame at `ms` from the random cursor, without moving the playback
    /// position. Do not interleave with `next_frame` without a `seek`.
    pub fn frame_at(&mut self, ms: i64) -> Option<Frame> {
        self.pair.as_mut()?.random()?.frame_at(ms)
    }

    /// Clip length in ms. Computed once, on whichever handle is already open.
    pub fn duration(&mut self) -> Option<i64> {
        if self.duration.is_none() {
            self.duration = self.pair.as_mut()?.any_open()?.duration();
        }
        self.duration
    }

    /// Offset of every frame in ms. Computed once, on the random cursor.
    pub fn frame_offsets(&mut self) -> Option<&[i64]> {
        if self.frame_offsets.is_none() {
            self.frame_offsets = self.pair.as_mut()?.random()?.frame_offsets();
        }
        self.frame_offsets.as_deref()
    }

    /// Offset of the frame the sequential cursor would return next.
    pub fn next_frame_offset(&mut self) -> Option<i64> {
        self.pair.as_mut()?.sequential()?.next_frame_offset()
    }

    pub fn has_audio(&mut self) -> bool {
        self.pair
            .as_mut()
            .and_then(|pair| pair.any_open())
            .map(|cursor| cursor.has_audio())
            .unwrap_or(false)
    }

    pub fn input_size(&mut self) -> Option<(u32, u32)> {
        self.pair.as_mut()?.any_open()?.input_size()
    }

    /// Mute or unmute every open handle.
    pub fn set_mute(&mut self, mute: bool) {
        self.mute = mute;
        if let Some(pair) = self.pair.as_mut() {
            pair.set_mute(mute);
        }
    }

    /// Change the output size of every open handle and of handles opened later.
    pub fn set_output_size(&mut self, width: u32, height: u32) {
        self.requested_size = (width, height);
        if let Some(pair) = self.pair.as_mut() {
            pair.set_output_size(width, height);
        }
    }

    pub fn mark_done(&mut self) {
        self.done = true;
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn prev_ms(&self) -> Option<i64> {
        self.prev_ms
    }

    /// Reposition playback from outside. The next step reseeks to `ms`;
    /// `None` restarts from the first frame.
    pub fn set_prev_ms(&mut self, ms: Option<i64>) {
        self.prev_ms = ms;
        self.force_reseek = true;
        self.done = false;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn requested_size(&self) -> (u32, u32) {
        self.requested_size
    }

    pub fn first_ms(&self) -> i64 {
        self.first_ms
    }

    pub fn is_muted(&self) -> bool {
        self.mute
    }
}

impl Drop for ClipReader {
    fn drop(&mut self) {
        self.close();
    }
}
