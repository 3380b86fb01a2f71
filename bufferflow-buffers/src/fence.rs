//! Completion fences for GPU and display work.
//!
//! A [`Fence`] is a set of sync points; it signals once every point in the set
//! has signaled and reports an error as soon as any point has errored. Merging
//! unions the sets, so merge is associative, commutative and idempotent, and
//! merging already-signaled fences yields a signaled fence.
//!
//! Sync points are created with [`Fence::pending`], which hands the producer a
//! [`FenceSignaler`]. Nothing in the pipeline waits on a fence; [`Fence::wait`]
//! exists for the composition stage and for tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Monotonic timestamp in nanoseconds.
pub type Nsecs = i64;

/// Observable state of a fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceStatus {
    Pending,
    /// Signaled at the given time. For merged fences this is the latest
    /// signal time among the inputs; the no-op fence reports 0.
    Signaled(Nsecs),
    Error,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FenceError {
    #[error("fence did not signal within {0:?}")]
    Timeout(Duration),
    #[error("fence signaled an error")]
    Errored,
}

#[derive(Debug)]
struct SyncPoint {
    id: u64,
    state: Mutex<FenceStatus>,
    cond: Condvar,
}

impl SyncPoint {
    fn new() -> Self {
        static NEXT_POINT: AtomicU64 = AtomicU64::new(1);
        Self {
            id: NEXT_POINT.fetch_add(1, Ordering::Relaxed),
            state: Mutex::new(FenceStatus::Pending),
            cond: Condvar::new(),
        }
    }

    // The guarded value is a plain enum; a panic elsewhere cannot leave it torn.
    fn lock(&self) -> MutexGuard<'_, FenceStatus> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve(&self, status: FenceStatus) -> bool {
        let mut state = self.lock();
        if *state != FenceStatus::Pending {
            return false;
        }
        *state = status;
        self.cond.notify_all();
        true
    }
}

/// Handle to a future completion event. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Fence {
    // Sorted by sync point id, no duplicates.
    points: Vec<Arc<SyncPoint>>,
}

impl Fence {
    /// A fence that is already signaled.
    pub fn signaled() -> Self {
        Self { points: Vec::new() }
    }

    /// A new unsignaled fence and the handle that resolves it.
    pub fn pending() -> (Self, FenceSignaler) {
        let point = Arc::new(SyncPoint::new());
        (
            Self {
                points: vec![point.clone()],
            },
            FenceSignaler { point },
        )
    }

    /// Combines `fences` into one that signals when all of them have.
    pub fn merge<'a>(fences: impl IntoIterator<Item = &'a Fence>) -> Self {
        let mut points: Vec<Arc<SyncPoint>> = fences.into_iter().flat_map(|f| f.points.iter().cloned()).collect();
        points.sort_by_key(|p| p.id);
        points.dedup_by_key(|p| p.id);
        Self { points }
    }

    /// Shorthand for merging two fences.
    pub fn merged_with(&self, other: &Fence) -> Self {
        Self::merge([self, other])
    }

    pub fn status(&self) -> FenceStatus {
        let mut latest: Nsecs = 0;
        let mut pending = false;
        for point in &self.points {
            match *point.lock() {
                FenceStatus::Error => return FenceStatus::Error,
                FenceStatus::Pending => pending = true,
                FenceStatus::Signaled(at) => latest = latest.max(at),
            }
        }
        if pending {
            FenceStatus::Pending
        } else {
            FenceStatus::Signaled(latest)
        }
    }

    pub fn is_signaled(&self) -> bool {
        matches!(self.status(), FenceStatus::Signaled(_))
    }

    pub fn has_error(&self) -> bool {
        self.status() == FenceStatus::Error
    }

    /// Signal time once signaled, `None` while pending or errored.
    pub fn signal_time(&self) -> Option<Nsecs> {
        match self.status() {
            FenceStatus::Signaled(at) => Some(at),
            _ => None,
        }
    }

    /// True when both fences track exactly the same completions.
    pub fn same_completions(&self, other: &Fence) -> bool {
        self.points.len() == other.points.len() && self.points.iter().zip(&other.points).all(|(a, b)| a.id == b.id)
    }

    /// Blocks until every input has signaled, an input errors, or `timeout`
    /// elapses. Returns the signal time on success. A timeout too large to
    /// form a deadline waits without one.
    pub fn wait(&self, timeout: Duration) -> Result<Nsecs, FenceError> {
        let deadline = Instant::now().checked_add(timeout);
        let mut latest: Nsecs = 0;
        for point in &self.points {
            let mut state = point.lock();
            loop {
                let current = *state;
                match current {
                    FenceStatus::Signaled(at) => {
                        latest = latest.max(at);
                        break;
                    }
                    FenceStatus::Error => return Err(FenceError::Errored),
                    FenceStatus::Pending => {
                        state = match deadline {
                            Some(deadline) => {
                                let now = Instant::now();
                                if now >= deadline {
                                    return Err(FenceError::Timeout(timeout));
                                }
                                let (guard, _) = point
                                    .cond
                                    .wait_timeout(state, deadline - now)
                                    .unwrap_or_else(PoisonError::into_inner);
                                guard
                            }
                            None => point.cond.wait(state).unwrap_or_else(PoisonError::into_inner),
                        };
                    }
                }
            }
        }
        Ok(latest)
    }
}

/// Producer side of a pending fence. The first resolution wins.
#[derive(Debug)]
pub struct FenceSignaler {
    point: Arc<SyncPoint>,
}

impl FenceSignaler {
    /// Marks the completion as done at `at`. Returns false if already resolved.
    pub fn signal(&self, at: Nsecs) -> bool {
        self.point.resolve(FenceStatus::Signaled(at))
    }

    /// Marks the completion as failed. Returns false if already resolved.
    pub fn fail(&self) -> bool {
        self.point.resolve(FenceStatus::Error)
    }
}
