//! Potentiometer direction estimator
//!
//! A single-sample derivative of the pot voltage is dominated by
//! electrical noise. The estimator instead averages the successive
//! differences over a short window per axis and applies a dead zone:
//! trends smaller than `zero_threshold` volts per sample are reported as
//! [`Direction::Stationary`].
//!
//! Until an axis window has filled (at start-up, or after [`reseed`]
//! following a forced reversal) the axis reports `Stationary`.
//!
//! [`reseed`]: DirectionEstimator::reseed

use crate::axis::{Axis, PerAxis};
use crate::config::EstimatorConfig;

use super::history::{VoltageHistory, HISTORY_LEN};

/// Ternary motion classification
///
/// `Forward` is the voltage-increasing direction; motor velocities share
/// the same sign convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Reverse,
    #[default]
    Stationary,
    Forward,
}

impl Direction {
    /// Direction of a signed quantity
    pub fn from_sign(value: i32) -> Self {
        match value {
            v if v > 0 => Direction::Forward,
            v if v < 0 => Direction::Reverse,
            _ => Direction::Stationary,
        }
    }

    /// Direction a motor moves the pot at the given commanded velocity
    pub fn of_velocity(velocity: i32) -> Self {
        Self::from_sign(velocity)
    }

    /// Signed unit value (-1, 0, +1)
    pub const fn signum(self) -> i8 {
        match self {
            Direction::Reverse => -1,
            Direction::Stationary => 0,
            Direction::Forward => 1,
        }
    }

    /// Check if this is a non-zero direction
    pub const fn is_moving(self) -> bool {
        !matches!(self, Direction::Stationary)
    }

    /// The opposite direction (`Stationary` stays `Stationary`)
    pub const fn reversed(self) -> Self {
        match self {
            Direction::Reverse => Direction::Forward,
            Direction::Stationary => Direction::Stationary,
            Direction::Forward => Direction::Reverse,
        }
    }
}

/// Per-axis windowed direction estimator
#[derive(Debug, Clone)]
pub struct DirectionEstimator<const N: usize = HISTORY_LEN> {
    histories: PerAxis<VoltageHistory<N>>,
    zero_threshold: f32,
}

impl<const N: usize> DirectionEstimator<N> {
    /// Create an estimator with an explicit dead zone (volts per sample)
    pub const fn new(zero_threshold: f32) -> Self {
        Self {
            histories: PerAxis::new(VoltageHistory::new(), VoltageHistory::new()),
            zero_threshold,
        }
    }

    /// Create an estimator from configuration
    pub const fn from_config(config: &EstimatorConfig) -> Self {
        Self::new(config.zero_threshold)
    }

    /// Dead-zone threshold in volts per sample
    pub fn zero_threshold(&self) -> f32 {
        self.zero_threshold
    }

    /// Append a voltage to an axis window
    pub fn record(&mut self, axis: Axis, volts: f32) {
        self.histories[axis].record(volts);
    }

    /// Append a voltage pair (one sampling cycle)
    pub fn record_pair(&mut self, volts: PerAxis<f32>) {
        for axis in Axis::ALL {
            self.record(axis, volts[axis]);
        }
    }

    /// Check if the axis window has filled and `direction()` can be trusted
    pub fn is_warm(&self, axis: Axis) -> bool {
        self.histories[axis].is_full()
    }

    /// Samples still needed before the axis is warm
    pub fn warm_up_remaining(&self, axis: Axis) -> usize {
        N - self.histories[axis].len()
    }

    /// Drop the axis history so the next `N` samples re-seed the window
    ///
    /// Used after an externally forced jump (a forced reversal), where
    /// samples from before the jump no longer describe the motion.
    pub fn reseed(&mut self, axis: Axis) {
        self.histories[axis].clear();
    }

    /// Most recent voltage of an axis
    pub fn latest(&self, axis: Axis) -> Option<f32> {
        self.histories[axis].latest()
    }

    /// Mean successive difference of the axis window
    pub fn trend(&self, axis: Axis) -> Option<f32> {
        self.histories[axis].mean_delta()
    }

    /// Access the raw history of an axis
    pub fn history(&self, axis: Axis) -> &VoltageHistory<N> {
        &self.histories[axis]
    }

    /// Classify the recent motion of an axis
    ///
    /// Returns `Stationary` during warm-up.
    pub fn direction(&self, axis: Axis) -> Direction {
        if !self.is_warm(axis) {
            return Direction::Stationary;
        }

        match self.trend(axis) {
            Some(mean) if mean >= self.zero_threshold => Direction::Forward,
            Some(mean) if mean <= -self.zero_threshold => Direction::Reverse,
            _ => Direction::Stationary,
        }
    }

    /// Classify both axes
    pub fn directions(&self) -> PerAxis<Direction> {
        PerAxis::from_fn(|axis| self.direction(axis))
    }
}
