use std::sync::Arc;

use tracing::{debug, warn};

use super::cursor::{ClipCursor, ClipDecoder, ClipOpenSpec, CursorMode};
use crate::error::ClipError;

/// Up to two independently positioned handles on one clip.
///
/// The handle opened by [`ClipCursorPair::open`] is unspecialized; the first
/// of [`sequential`](Self::sequential) or [`random`](Self::random) to be
/// called claims it. The other mode opens a fresh handle on demand. At most
/// two handles exist for the life of the pair.
pub struct ClipCursorPair {
    decoder: Arc<dyn ClipDecoder>,
    spec: ClipOpenSpec,
    first: Option<Box<dyn ClipCursor>>,
    sequential: Option<Box<dyn ClipCursor>>,
    random: Option<Box<dyn ClipCursor>>,
}

impl ClipCursorPair {
    /// Open the clip's first handle. Fails if the file cannot be decoded.
    pub fn open(decoder: Arc<dyn ClipDecoder>, spec: ClipOpenSpec) -> Result<Self, ClipError> {
        let first = decoder.open(&spec)?;
        Ok(Self {
            decoder,
            spec,
            first: Some(first),
            sequential: None,
            random: None,
        })
    }

    /// The forward-reading handle, opened on first use.
    pub fn sequential(&mut self) -> Option<&mut (dyn ClipCursor + 'static)> {
        if self.sequential.is_none() {
            self.sequential = self.claim(CursorMode::Sequential);
        }
        self.sequential.as_deref_mut()
    }

    /// The seeking handle, opened on first use.
    pub fn random(&mut self) -> Option<&mut (dyn ClipCursor + 'static)> {
        if self.random.is_none() {
            self.random = self.claim(CursorMode::Random);
        }
        self.random.as_deref_mut()
    }

    /// Any handle that is already open, preferring the sequential one.
    pub fn any_open(&mut self) -> Option<&mut (dyn ClipCursor + 'static)> {
        if self.sequential.is_some() {
            return self.sequential.as_deref_mut();
        }
        if self.random.is_some() {
            return self.random.as_deref_mut();
        }
        self.first.as_deref_mut()
    }

    /// Every open handle, for settings that apply to all of them.
    pub fn for_each_open(&mut self, mut f: impl FnMut(&mut dyn ClipCursor)) {
        for cursor in [&mut self.first, &mut self.sequential, &mut self.random]
            .into_iter()
            .flatten()
        {
            f(&mut **cursor);
        }
    }

    /// Applies to open handles and to any opened later.
    pub fn set_mute(&mut self, mute: bool) {
        self.spec.options.audio_mute = mute;
        self.for_each_open(|cursor| cursor.set_mute(mute));
    }

    /// Applies to open handles and to any opened later.
    pub fn set_output_size(&mut self, width: u32, height: u32) {
        self.spec.width = width;
        self.spec.height = height;
        self.for_each_open(|cursor| cursor.set_output_size(width, height));
    }

    /// Number of handles currently open.
    pub fn open_count(&self) -> usize {
        [&self.first, &self.sequential, &self.random]
            .iter()
            .filter(|c| c.is_some())
            .count()
    }

    /// Release every handle.
    pub fn close(&mut self) {
        for slot in [&mut self.first, &mut self.sequential, &mut self.random] {
            if let Some(mut cursor) = slot.take() {
                cursor.close();
            }
        }
    }

    fn claim(&mut self, mode: CursorMode) -> Option<Box<dyn ClipCursor>> {
        let mut cursor = match self.first.take() {
            Some(cursor) => cursor,
            None => match self.decoder.open(&self.spec) {
                Ok(cursor) => cursor,
                Err(e) => {
                    warn!(path = %self.spec.path.display(), ?mode, error = %e, "failed to open cursor");
                    return None;
                }
            },
        };
        debug!(path = %self.spec.path.display(), ?mode, "cursor ready");
        cursor.set_mode(mode);
        Some(cursor)
    }
}

impl Drop for ClipCursorPair {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingDecoder {
        opens: AtomicUsize,
        modes: Mutex<Vec<CursorMode>>,
    }

    struct NullCursor {
        counts: Arc<CountingDecoder>,
    }

    impl ClipCursor for NullCursor {
        fn set_mode(&mut self, mode: CursorMode) {
            self.counts.modes.lock().unwrap().push(mode);
        }
        fn next_frame(&mut self) -> Option<Frame> {
            None
        }
        fn prev_frame(&mut self) -> Option<Frame> {
            None
        }
        fn frame_at(&mut self, _ms: i64) -> Option<Frame> {
            None
        }
        fn seek(&mut self, _after_ms: Option<i64>) -> bool {
            true
        }
        fn frame_offsets(&mut self) -> Option<Vec<i64>> {
            None
        }
        fn duration(&mut self) -> Option<i64> {
            None
        }
        fn next_frame_offset(&mut self) -> Option<i64> {
            None
        }
        fn has_audio(&self) -> bool {
            false
        }
        fn input_size(&self) -> Option<(u32, u32)> {
            None
        }
        fn set_mute(&mut self, _mute: bool) {}
        fn set_output_size(&mut self, _width: u32, _height: u32) {}
        fn close(&mut self) {}
    }

    struct SharedDecoder(Arc<CountingDecoder>);

    impl ClipDecoder for SharedDecoder {
        fn open(&self, _spec: &ClipOpenSpec) -> Result<Box<dyn ClipCursor>, ClipError> {
            self.0.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(NullCursor {
                counts: self.0.clone(),
            }))
        }
    }

    fn open_pair() -> (ClipCursorPair, Arc<CountingDecoder>) {
        let counts = Arc::new(CountingDecoder::default());
        let decoder = Arc::new(SharedDecoder(counts.clone()));
        let pair = ClipCursorPair::open(decoder, ClipOpenSpec::probe(Path::new("a.mp4"))).unwrap();
        (pair, counts)
    }

    #[test]
    fn test_single_mode_uses_one_handle() {
        let (mut pair, counts) = open_pair();
        for _ in 0..5 {
            assert!(pair.sequential().is_some());
        }
        assert_eq!(counts.opens.load(Ordering::SeqCst), 1);
        assert_eq!(pair.open_count(), 1);
    }

    #[test]
    fn test_mixed_modes_use_two_handles() {
        let (mut pair, counts) = open_pair();
        pair.random();
        pair.sequential();
        pair.random();
        pair.sequential();
        assert_eq!(counts.opens.load(Ordering::SeqCst), 2);
        assert_eq!(
            *counts.modes.lock().unwrap(),
            vec![CursorMode::Random, CursorMode::Sequential]
        );
    }

    #[test]
    fn test_close_releases_everything() {
        let (mut pair, _) = open_pair();
        pair.sequential();
        pair.random();
        assert_eq!(pair.open_count(), 2);
        pair.close();
        assert_eq!(pair.open_count(), 0);
        assert!(pair.any_open().is_none());
    }
}
