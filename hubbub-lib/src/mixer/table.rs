//! Owner-keyed queues of pending samples.
//!
//! The stream table is the single piece of state shared between producer
//! threads and the output callback. Producers append decoded buffers under
//! an owner key; the callback captures one frame's worth of chunks per pull.
//! All access goes through one mutex held by the caller; the table itself
//! is plain single-threaded data.

use std::collections::{HashMap, VecDeque};

/// Pending sample buffers, keyed by owner, FIFO per owner.
///
/// Invariant: no owner maps to an empty queue. `push` always inserts a
/// non-empty buffer and `capture_frame` prunes owners it exhausts, so the
/// table being empty is the same thing as having no pending audio.
#[derive(Debug, Default)]
pub(crate) struct StreamTable {
    queues: HashMap<String, VecDeque<Vec<i16>>>,
}

impl StreamTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a decoded buffer to the owner's queue.
    pub(crate) fn push(&mut self, owner: &str, samples: Vec<i16>) {
        if samples.is_empty() {
            return;
        }
        self.queues
            .entry(owner.to_string())
            .or_default()
            .push_back(samples);
    }

    /// Drop everything queued for `owner`, returning how many buffers went.
    /// An absent owner is a no-op and returns zero.
    pub(crate) fn evict(&mut self, owner: &str) -> usize {
        self.queues.remove(owner).map_or(0, |queue| queue.len())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Number of owners with pending audio.
    pub(crate) fn pending_owners(&self) -> usize {
        self.queues.len()
    }

    pub(crate) fn clear(&mut self) {
        self.queues.clear();
    }

    /// Capture one head chunk per owner, each exactly `frame_len` samples.
    ///
    /// A head shorter than the frame is consumed whole and zero-padded; a
    /// longer head gives up its first `frame_len` samples and keeps the
    /// remainder for the next pull. Owners left with nothing queued are
    /// removed. Returns the captured chunks; the arithmetic mix happens on
    /// the caller's side, after the table lock is released.
    pub(crate) fn capture_frame(&mut self, frame_len: usize) -> Vec<Vec<i16>> {
        let mut chunks = Vec::with_capacity(self.queues.len());
        for queue in self.queues.values_mut() {
            let Some(head) = queue.front_mut() else {
                continue;
            };
            if head.len() <= frame_len {
                if let Some(mut chunk) = queue.pop_front() {
                    chunk.resize(frame_len, 0);
                    chunks.push(chunk);
                }
            } else {
                let remainder = head.split_off(frame_len);
                let chunk = std::mem::replace(head, remainder);
                chunks.push(chunk);
            }
        }
        self.queues.retain(|_, queue| !queue.is_empty());
        chunks
    }
}
