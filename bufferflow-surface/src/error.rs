use bufferflow_buffers::{BufferId, Nsecs};
use thiserror::Error;

/// Why a latch attempt did nothing. The pipeline is unchanged in every case.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LatchError {
    #[error("no pending buffer to latch")]
    NoPendingBuffer,
    #[error("pending buffer is not due for presentation at {expected_present_time}")]
    NotDue { expected_present_time: Nsecs },
    #[error("acquire fence of {buffer} reported an error")]
    AcquireFenceError { buffer: BufferId },
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PipelineError {
    #[error("{0} is neither the current nor the previous buffer")]
    UnknownBuffer(BufferId),
    #[error("no surface frame queued for frame {frame_number}")]
    MissingSurfaceFrame { frame_number: u64 },
}
