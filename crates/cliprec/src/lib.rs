//! Rotating clip capture and clip playback.
//!
//! Two halves share this crate:
//!
//! - **Capture**: [`StreamSession`] polls a [`FrameSource`], notices when the
//!   engine rolls over to a new segment file, and hands the finished segment
//!   to a single background [`SegmentMover`] that relocates it into storage
//!   and commits it to a [`ClipIndex`].
//! - **Playback**: [`ClipReader`] serves forward playback and random seeks
//!   over one clip through a [`ClipCursorPair`], so thumbnails and scrubbing
//!   never disturb the forward decode position.
//!
//! The decode/capture engine itself sits behind the [`FrameSource`] and
//! [`ClipDecoder`] traits.

pub mod clip;
pub mod error;
pub mod frame;
pub mod index;
pub mod mover;
pub mod relocate;
pub mod segment;
pub mod session;
pub mod source;
pub mod sqlite_index;
pub mod stats;
pub mod telemetry;

pub use clip::{
    clip_duration, clip_frame_offsets, ClipCursor, ClipCursorPair, ClipDecoder, ClipOpenOptions,
    ClipOpenSpec, ClipReader, CursorMode, Overlay,
};
pub use error::{CaptureError, ClipError, IndexError, RelocateError};
pub use frame::{CapturedFrame, FpsInfo, Frame};
pub use index::{ClipIndex, ClipRecord, MemoryClipIndex};
pub use mover::{MoveFailedCallback, MoveJob, MoveOutcome, SegmentMover};
pub use relocate::Relocator;
pub use segment::{Segment, SegmentTracker};
pub use session::{SessionState, StreamOptions, StreamSession};
pub use source::{CaptureStream, FrameSource, OpenFlags, OpenRequest};
pub use sqlite_index::SqliteClipIndex;
pub use stats::TimingStat;
