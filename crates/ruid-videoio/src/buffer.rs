//! Bounded FIFO shared by the capture thread and the reader.
//!
//! One mutex guards the queue, the shutdown flag and the drop counter.
//! Readers wait on `not_empty`, the writer on `not_full`; both re-check
//! their predicate after every wakeup.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::Frame;

/// Result of handing a frame to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// Buffer was full and the frame was discarded (live policy).
    Dropped,
    /// Shutdown was signalled; the frame was discarded.
    Closed,
}

#[derive(Default)]
struct State {
    frames: VecDeque<Frame>,
    shutdown: bool,
    dropped: u64,
}

pub struct FrameBuffer {
    capacity: usize,
    state: Mutex<State>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl FrameBuffer {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity: capacity.get(),
            state: Mutex::new(State {
                frames: VecDeque::with_capacity(capacity.get()),
                ..State::default()
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    // Every critical section leaves `State` consistent, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append, waiting while the buffer is full.
    pub fn push(&self, frame: Frame) -> PushOutcome {
        let state = self.lock();
        let mut state = self
            .not_full
            .wait_while(state, |s| s.frames.len() >= self.capacity && !s.shutdown)
            .unwrap_or_else(PoisonError::into_inner);
        if state.shutdown {
            return PushOutcome::Closed;
        }
        state.frames.push_back(frame);
        self.not_empty.notify_one();
        PushOutcome::Queued
    }

    /// Append without ever waiting; a full buffer rejects the incoming frame.
    pub fn try_push(&self, frame: Frame) -> PushOutcome {
        let mut state = self.lock();
        if state.shutdown {
            return PushOutcome::Closed;
        }
        if state.frames.len() >= self.capacity {
            state.dropped += 1;
            return PushOutcome::Dropped;
        }
        state.frames.push_back(frame);
        self.not_empty.notify_one();
        PushOutcome::Queued
    }

    /// Remove the oldest frame, waiting while empty.  `None` once shutdown
    /// has been signalled and nothing is left.
    pub fn pop(&self) -> Option<Frame> {
        let state = self.lock();
        let mut state = self
            .not_empty
            .wait_while(state, |s| s.frames.is_empty() && !s.shutdown)
            .unwrap_or_else(PoisonError::into_inner);
        let frame = state.frames.pop_front();
        if frame.is_some() {
            self.not_full.notify_one();
        }
        frame
    }

    /// Drop everything buffered and return how many frames went.  Does not wake waiters.
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let n = state.frames.len();
        state.frames.clear();
        n
    }

    /// Set the shutdown flag (never reset) and wake both sides.
    pub fn signal_shutdown(&self) {
        let mut state = self.lock();
        state.shutdown = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.lock().shutdown
    }

    pub fn len(&self) -> usize {
        self.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames rejected by [`FrameBuffer::try_push`] because the buffer was full.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }
}
