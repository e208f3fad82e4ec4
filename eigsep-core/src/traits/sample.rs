//! Raw sample source trait

use crate::sensor::RawPair;

/// Failure to obtain a sample pair
///
/// All variants are transient: the sampler retries on the next cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleError {
    /// No complete sample arrived within the read timeout
    Timeout,
    /// A frame arrived but could not be decoded
    Malformed,
    /// The underlying transport failed
    Io,
}

impl core::fmt::Display for SampleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SampleError::Timeout => f.write_str("sample read timed out"),
            SampleError::Malformed => f.write_str("malformed sample frame"),
            SampleError::Io => f.write_str("sample transport error"),
        }
    }
}

impl core::error::Error for SampleError {}

/// Producer of raw per-axis potentiometer samples, in (az, alt) order
///
/// Each call waits for the next sample. Implementations bound the wait
/// with their own read timeout and return [`SampleError::Timeout`].
#[allow(async_fn_in_trait)]
pub trait SampleSource {
    async fn next_sample(&mut self) -> Result<RawPair, SampleError>;
}
