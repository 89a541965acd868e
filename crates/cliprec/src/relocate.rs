//! Moving finished segments from the recording directory into storage.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::RelocateError;
use crate::source::FrameSource;

/// How a segment reaches storage.
#[derive(Clone)]
pub enum Relocator {
    /// The engine wrote a real file; rename it (copy across filesystems).
    Filesystem,
    /// The engine holds the segment in memory and writes it out on request.
    Engine(Arc<dyn FrameSource>),
}

impl fmt::Debug for Relocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relocator::Filesystem => f.write_str("Filesystem"),
            Relocator::Engine(_) => f.write_str("Engine"),
        }
    }
}

impl Relocator {
    /// Move `src` to `dst`, creating `dst`'s parent first.
    ///
    /// A failure to create the parent is logged and the move is still tried,
    /// so the caller always gets the move's own result.
    pub fn relocate(&self, src: &Path, dst: &Path) -> Result<(), RelocateError> {
        if let Some(parent) = dst.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(dir = %parent.display(), error = %e, "failed to create storage directory");
            }
        }

        match self {
            Relocator::Filesystem => move_file(src, dst).map_err(|source| RelocateError::Move {
                from: src.to_path_buf(),
                to: dst.to_path_buf(),
                source,
            }),
            Relocator::Engine(engine) => {
                engine
                    .move_recorded_file(src, dst)
                    .map_err(|source| RelocateError::Engine {
                        from: src.to_path_buf(),
                        to: dst.to_path_buf(),
                        source,
                    })
            }
        }
    }
}

/// Rename, falling back to copy + delete across filesystems.
pub fn move_file(src: &Path, dst: &Path) -> io::Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(libc::EXDEV) => {
            debug!(src = %src.display(), "cross-device move, copying");
            fs::copy(src, dst)?;
            fs::remove_file(src)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moves_into_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("rec/seg.mp4");
        fs::create_dir_all(src.parent().unwrap()).unwrap();
        fs::write(&src, b"frames").unwrap();

        let dst = dir.path().join("store/yard/seg/seg.mp4");
        Relocator::Filesystem.relocate(&src, &dst).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).unwrap(), b"frames");
    }

    #[test]
    fn test_missing_source_reports_paths() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("nope.mp4");
        let dst = dir.path().join("out/nope.mp4");

        match Relocator::Filesystem.relocate(&src, &dst) {
            Err(RelocateError::Move { from, to, source }) => {
                assert_eq!(from, src);
                assert_eq!(to, dst);
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_blocked_directory_still_attempts_move() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("seg.mp4");
        fs::write(&src, b"x").unwrap();
        // A plain file where the destination directory should go.
        fs::write(dir.path().join("blocked"), b"").unwrap();

        let dst = dir.path().join("blocked/seg.mp4");
        assert!(Relocator::Filesystem.relocate(&src, &dst).is_err());
        assert!(src.exists());
    }
}
