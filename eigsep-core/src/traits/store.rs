//! Calibrated voltage range persistence

use crate::config::AxisRanges;

/// Load/store of the per-axis calibrated voltage ranges
///
/// The format is owned by the implementation. The control logic loads
/// once at start-up; only the calibration procedure stores.
pub trait RangeStore {
    type Error;

    /// Load the saved ranges, `None` if the mount was never calibrated
    fn load(&mut self) -> Result<Option<AxisRanges>, Self::Error>;

    /// Persist ranges, replacing any previous ones
    fn store(&mut self, ranges: &AxisRanges) -> Result<(), Self::Error>;
}
