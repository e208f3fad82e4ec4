//! Fixed-capacity voltage history
//!
//! A FIFO ring of the most recent voltages of one axis. Inserting into a
//! full history evicts the oldest entry, so after warm-up the length is
//! always the capacity.

use heapless::HistoryBuffer;

/// Default history window (samples per axis)
///
/// Smaller windows react faster to a reversal but let more noise through.
pub const HISTORY_LEN: usize = 5;

/// Recent voltages of one axis, oldest first
#[derive(Clone)]
pub struct VoltageHistory<const N: usize = HISTORY_LEN> {
    buf: HistoryBuffer<f32, N>,
}

impl<const N: usize> Default for VoltageHistory<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> core::fmt::Debug for VoltageHistory<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<const N: usize> VoltageHistory<N> {
    /// Create an empty history
    pub const fn new() -> Self {
        Self {
            buf: HistoryBuffer::new(),
        }
    }

    /// Append a voltage, evicting the oldest when full
    pub fn record(&mut self, volts: f32) {
        self.buf.write(volts);
    }

    /// Number of stored samples
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.buf.len() == 0
    }

    /// Window size
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Check if the window has filled since the last reset
    pub fn is_full(&self) -> bool {
        self.buf.len() == N
    }

    /// Drop every stored sample
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Most recent voltage
    pub fn latest(&self) -> Option<f32> {
        self.buf.recent().copied()
    }

    /// Stored voltages in arrival order
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.buf.oldest_ordered().copied()
    }

    /// Arithmetic mean of the successive differences across the window
    ///
    /// Returns `None` with fewer than two samples.
    pub fn mean_delta(&self) -> Option<f32> {
        if self.buf.len() < 2 {
            return None;
        }

        let mut prev: Option<f32> = None;
        let mut sum = 0.0f32;
        let mut count = 0u32;
        for v in self.iter() {
            if let Some(p) = prev {
                sum += v - p;
                count += 1;
            }
            prev = Some(v);
        }

        Some(sum / count as f32)
    }
}
