//! Calibrated potentiometer voltage ranges
//!
//! Written by the calibration procedure, loaded once at start-up and
//! read-only for the rest of the session.

use core::fmt;

use crate::axis::{Axis, PerAxis};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Range minimum is not below its maximum
    EmptyRange(Axis),
    /// A value must be finite and positive
    InvalidValue(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyRange(axis) => {
                write!(f, "voltage range for {} must have min < max", axis)
            }
            ConfigError::InvalidValue(name) => write!(f, "invalid value for `{}`", name),
        }
    }
}

impl core::error::Error for ConfigError {}

/// Voltage span of one potentiometer between its end stops
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "[f32; 2]", into = "[f32; 2]"))]
pub struct VoltageRange {
    min: f32,
    max: f32,
}

impl VoltageRange {
    /// Create a range, rejecting `min >= max` (and NaN bounds)
    pub fn new(axis: Axis, min: f32, max: f32) -> Result<Self, ConfigError> {
        if min < max {
            Ok(Self { min, max })
        } else {
            Err(ConfigError::EmptyRange(axis))
        }
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    /// Width of the range in volts
    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    /// Check if a voltage is at or beyond the maximum
    pub fn at_max(&self, volts: f32) -> bool {
        volts >= self.max
    }

    /// Check if a voltage is at or beyond the minimum
    pub fn at_min(&self, volts: f32) -> bool {
        volts <= self.min
    }

    /// Check if a voltage is within `margin` of either end
    pub fn near_end(&self, volts: f32, margin: f32) -> bool {
        volts >= self.max - margin || volts <= self.min + margin
    }

    /// Shrink the range by `delta` at both ends
    ///
    /// Used by calibration to keep the soft limits clear of the hard stops.
    pub fn shrink(&self, axis: Axis, delta: f32) -> Result<Self, ConfigError> {
        Self::new(axis, self.min + delta, self.max - delta)
    }
}

impl TryFrom<[f32; 2]> for VoltageRange {
    type Error = ConfigError;

    fn try_from([min, max]: [f32; 2]) -> Result<Self, Self::Error> {
        // The axis is not known here; callers validate through AxisRanges
        if min < max {
            Ok(Self { min, max })
        } else {
            Err(ConfigError::InvalidValue("volt_range"))
        }
    }
}

impl From<VoltageRange> for [f32; 2] {
    fn from(range: VoltageRange) -> Self {
        [range.min, range.max]
    }
}

/// Calibrated voltage range for each axis
pub type AxisRanges = PerAxis<VoltageRange>;

/// Default ranges before calibration
///
/// Centre of the pot is ~1.2 V and one turn is ~0.5 V.
pub const DEFAULT_RANGE: VoltageRange = VoltageRange { min: 0.7, max: 1.7 };

impl Default for VoltageRange {
    fn default() -> Self {
        DEFAULT_RANGE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_range() {
        assert_eq!(
            VoltageRange::new(Axis::Az, 1.5, 1.5),
            Err(ConfigError::EmptyRange(Axis::Az))
        );
        assert_eq!(
            VoltageRange::new(Axis::Alt, 2.0, 1.0),
            Err(ConfigError::EmptyRange(Axis::Alt))
        );
        assert!(VoltageRange::new(Axis::Az, f32::NAN, 1.0).is_err());
        assert!(VoltageRange::try_from([2.0, 1.0]).is_err());
    }

    #[test]
    fn test_limits() {
        let range = VoltageRange::new(Axis::Az, 0.5, 2.5).unwrap();
        assert!(range.at_max(2.5));
        assert!(!range.at_max(2.49));
        assert!(range.at_min(0.4));
        assert!(range.near_end(2.45, 0.1));
        assert!(range.near_end(0.55, 0.1));
        assert!(!range.near_end(1.5, 0.1));
    }

    #[test]
    fn test_shrink() {
        let range = VoltageRange::new(Axis::Alt, 0.5, 2.5).unwrap();
        let shrunk = range.shrink(Axis::Alt, 0.1).unwrap();
        assert!((shrunk.min() - 0.6).abs() < 1e-6);
        assert!((shrunk.max() - 2.4).abs() < 1e-6);

        // shrinking past the middle empties the range
        assert_eq!(
            range.shrink(Axis::Alt, 1.5),
            Err(ConfigError::EmptyRange(Axis::Alt))
        );
    }
}
