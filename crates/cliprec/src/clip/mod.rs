//! Clip playback.
//!
//! A [`ClipReader`] keeps up to two decode cursors into one clip: a
//! sequential one for forward/backward stepping and a random one for seeks
//! and thumbnails. Whichever is asked for first reuses the handle opened to
//! validate the clip, so single-mode callers only ever open one.

mod cursor;
mod pair;
mod reader;

pub use cursor::{ClipCursor, ClipDecoder, ClipOpenOptions, ClipOpenSpec, CursorMode, Overlay};
pub use pair::ClipCursorPair;
pub use reader::ClipReader;

use std::path::Path;

use tracing::warn;

/// Open one handle, read the clip's duration, release it.
pub fn clip_duration(decoder: &dyn ClipDecoder, path: &Path) -> Option<i64> {
    probe(decoder, path, |cursor| cursor.duration())
}

/// Open one handle, read every frame offset, release it.
pub fn clip_frame_offsets(decoder: &dyn ClipDecoder, path: &Path) -> Option<Vec<i64>> {
    probe(decoder, path, |cursor| cursor.frame_offsets())
}

fn probe<T>(
    decoder: &dyn ClipDecoder,
    path: &Path,
    query: impl FnOnce(&mut dyn ClipCursor) -> Option<T>,
) -> Option<T> {
    let spec = ClipOpenSpec::probe(path);
    let mut cursor = match decoder.open(&spec) {
        Ok(cursor) => cursor,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "clip probe failed");
            return None;
        }
    };
    cursor.set_mode(CursorMode::Random);
    let result = query(&mut *cursor);
    cursor.close();
    result
}
