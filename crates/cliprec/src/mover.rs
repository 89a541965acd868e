//! Single-slot background relocation of finished segments.
//!
//! ```text
//!  poll thread                         mover thread
//!  ───────────                         ────────────
//!  submit(job) ──── jobs channel ────▶ relocate file
//!     │  (waits first if a job                │
//!     │   is still in flight)                 ▼
//!     │                                index.commit()
//!  try_reap() / wait() ◀── done channel ──────┘
//! ```
//!
//! At most one job is ever in flight, so commits land in submission order.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use crate::error::RelocateError;
use crate::index::{ClipIndex, ClipRecord};
use crate::relocate::Relocator;
use crate::segment::Segment;

/// Called on the mover thread with the segment's logical path when a move fails.
///
/// If the relocation itself failed the file is still in the record dir. If
/// only the index commit failed the file has already reached storage at the
/// logical path and is simply not indexed.
pub type MoveFailedCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Snapshot of everything one relocation needs. Owned by the mover once submitted.
pub struct MoveJob {
    pub segment: Segment,
    /// Directory the engine recorded the segment into.
    pub record_dir: PathBuf,
    /// Storage root; the segment lands at `<storage_dir>/<storage_path>`.
    pub storage_dir: PathBuf,
    pub index: Arc<dyn ClipIndex>,
    pub relocator: Relocator,
    pub on_failed: Option<MoveFailedCallback>,
}

/// Result of one finished job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub logical_path: String,
    pub committed: bool,
    pub move_time: Duration,
    pub add_time: Duration,
}

impl MoveJob {
    /// Relocate, then commit. Any failure fires the callback and skips the commit.
    pub fn run(self) -> MoveOutcome {
        let logical_path = self.segment.logical_path();
        let src = self.record_dir.join(&self.segment.file_name);
        let dst = self.storage_dir.join(self.segment.storage_path());

        let started = Instant::now();
        let moved = self.relocator.relocate(&src, &dst);
        let move_time = started.elapsed();

        let mut add_time = Duration::ZERO;
        let result = moved.and_then(|()| {
            let started = Instant::now();
            let record = ClipRecord::from(&self.segment);
            let committed = self
                .index
                .commit(&record)
                .map_err(|source| RelocateError::Commit {
                    path: record.path.clone(),
                    source,
                });
            add_time = started.elapsed();
            committed
        });

        let committed = match result {
            Ok(()) => {
                debug!(
                    path = %logical_path,
                    start_ms = self.segment.start_ms,
                    end_ms = self.segment.end_ms,
                    "segment stored"
                );
                true
            }
            Err(e) => {
                warn!(path = %logical_path, error = %e, "segment relocation failed");
                if let Some(callback) = &self.on_failed {
                    callback(&logical_path);
                }
                false
            }
        };

        MoveOutcome {
            logical_path,
            committed,
            move_time,
            add_time,
        }
    }
}

/// Reusable worker thread with one job slot.
pub struct SegmentMover {
    name: String,
    jobs: Option<Sender<MoveJob>>,
    done: Option<Receiver<MoveOutcome>>,
    worker: Option<JoinHandle<()>>,
    in_flight: bool,
    /// Outcome of a job that had to run on the caller's thread.
    finished: Option<MoveOutcome>,
}

impl SegmentMover {
    /// The worker thread is spawned on the first submit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            jobs: None,
            done: None,
            worker: None,
            in_flight: false,
            finished: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Start `job`, first waiting for any job still in flight.
    /// Returns the outcome of the job that was waited on.
    pub fn submit(&mut self, job: MoveJob) -> Option<MoveOutcome> {
        let previous = if self.in_flight {
            debug!(mover = %self.name, "previous move still running, waiting");
            self.wait()
        } else {
            None
        };

        let unsent = match self.sender() {
            Some(tx) => tx.send(job).err().map(|mpsc::SendError(job)| job),
            None => Some(job),
        };

        if let Some(job) = unsent {
            if self.jobs.is_some() {
                error!(mover = %self.name, "mover thread gone, moving on caller thread");
                self.shutdown_worker();
            }
            self.finished = Some(job.run());
        }
        self.in_flight = true;
        previous
    }

    /// Non-blocking: collect the in-flight job's outcome if it has finished.
    pub fn try_reap(&mut self) -> Option<MoveOutcome> {
        if !self.in_flight {
            return None;
        }
        if let Some(outcome) = self.finished.take() {
            self.in_flight = false;
            return Some(outcome);
        }
        let rx = self.done.as_ref()?;
        match rx.try_recv() {
            Ok(outcome) => {
                self.in_flight = false;
                Some(outcome)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                error!(mover = %self.name, "mover thread exited with a job in flight");
                self.in_flight = false;
                None
            }
        }
    }

    /// Block until the in-flight job (if any) has relocated and committed.
    pub fn wait(&mut self) -> Option<MoveOutcome> {
        if !self.in_flight {
            return None;
        }
        self.in_flight = false;
        if let Some(outcome) = self.finished.take() {
            return Some(outcome);
        }
        match self.done.as_ref().map(|rx| rx.recv()) {
            Some(Ok(outcome)) => Some(outcome),
            _ => {
                error!(mover = %self.name, "mover thread exited with a job in flight");
                None
            }
        }
    }

    /// Shutdown rendezvous; always blocks until outstanding work is committed.
    pub fn drain(&mut self) -> Option<MoveOutcome> {
        self.wait()
    }

    fn sender(&mut self) -> Option<&Sender<MoveJob>> {
        if self.jobs.is_none() {
            let (job_tx, job_rx) = mpsc::channel::<MoveJob>();
            let (done_tx, done_rx) = mpsc::channel::<MoveOutcome>();

            let spawned = thread::Builder::new()
                .name(format!("mover-{}", self.name))
                .spawn(move || {
                    for job in job_rx {
                        if done_tx.send(job.run()).is_err() {
                            break;
                        }
                    }
                });

            match spawned {
                Ok(handle) => {
                    self.jobs = Some(job_tx);
                    self.done = Some(done_rx);
                    self.worker = Some(handle);
                }
                Err(e) => {
                    error!(mover = %self.name, error = %e, "failed to spawn mover thread");
                }
            }
        }
        self.jobs.as_ref()
    }

    fn shutdown_worker(&mut self) {
        // Closing the job channel ends the worker loop after its current job.
        self.jobs = None;
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!(mover = %self.name, "mover thread panicked");
            }
        }
        self.done = None;
    }
}

impl Drop for SegmentMover {
    fn drop(&mut self) {
        self.shutdown_worker();
    }
}
