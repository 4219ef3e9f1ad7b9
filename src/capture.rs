//! Falling-edge capture buffer.
//!
//! The GPIO layer appends timestamps from its own context (interrupt, callback
//! thread) through an [`EdgeSink`]. The driver is the only reader and only looks
//! at the buffer after capture has been disarmed or while polling its length.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

/// Number of timestamps a log can hold. Anything beyond a full transmission is
/// only counted.
pub const EDGE_CAPACITY: usize = 48;

/// Single-writer, single-reader log of falling-edge timestamps.
#[derive(Debug)]
pub struct EdgeLog {
    slots: [AtomicU32; EDGE_CAPACITY],
    len: AtomicUsize,
    armed: AtomicBool,
}

impl EdgeLog {
    /// Creates an empty, disarmed log.
    pub const fn new() -> Self {
        Self {
            slots: [const { AtomicU32::new(0) }; EDGE_CAPACITY],
            len: AtomicUsize::new(0),
            armed: AtomicBool::new(false),
        }
    }

    /// Clears previous edges and starts accepting new ones.
    pub fn arm(&self) {
        self.len.store(0, Ordering::Relaxed);
        self.armed.store(true, Ordering::Release);
    }

    /// Stops accepting edges. Edges already recorded are kept.
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Appends a timestamp. Must only be called from one context at a time.
    pub fn record(&self, timestamp_us: u32) {
        if !self.armed.load(Ordering::Acquire) {
            return;
        }
        let index = self.len.load(Ordering::Relaxed);
        if let Some(slot) = self.slots.get(index) {
            slot.store(timestamp_us, Ordering::Relaxed);
        }
        self.len.store(index.saturating_add(1), Ordering::Release);
    }

    /// Number of edges seen since the last [`arm`](Self::arm), including those
    /// that did not fit.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the stored timestamps into `out` in capture order.
    ///
    /// Returns the number of edges seen. Only the first
    /// `seen.min(EDGE_CAPACITY)` entries of `out` are written, all taken from
    /// the same snapshot of the length.
    pub fn copy_into(&self, out: &mut [u32; EDGE_CAPACITY]) -> usize {
        let seen = self.len();
        let stored = seen.min(EDGE_CAPACITY);
        for (dst, src) in out.iter_mut().zip(&self.slots[..stored]) {
            *dst = src.load(Ordering::Relaxed);
        }
        seen
    }
}

impl Default for EdgeLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle given to the GPIO layer to deliver falling-edge timestamps.
#[derive(Debug, Clone)]
pub struct EdgeSink(Arc<EdgeLog>);

impl EdgeSink {
    pub(crate) fn new(log: Arc<EdgeLog>) -> Self {
        Self(log)
    }

    /// Records a falling edge seen at `timestamp_us` on the port's
    /// microsecond tick counter. Ignored while capture is disarmed.
    pub fn record(&self, timestamp_us: u32) {
        self.0.record(timestamp_us);
    }
}
