//! Motor traits
//!
//! Two layers:
//! - [`MotorDriver`]: one driver board. Receives an already clamped,
//!   sign-normalized velocity per axis and translates it into pin, PWM or
//!   register writes, hiding the board's polarity convention.
//! - [`MotorBackend`]: the capability set the control logic talks to.
//!   Owns the commanded velocity per axis, clamps requests, debounces
//!   reversals and reports every decision as an
//!   [`Event`](crate::state::Event).
//!
//! Sign convention at both boundaries: positive velocity moves the axis
//! in the voltage-increasing direction.

use crate::axis::{Axis, AxisSet, PerAxis};
use crate::state::EventSink;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Inclusive velocity bounds of a driver board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpeedLimits {
    pub min: i32,
    pub max: i32,
}

impl SpeedLimits {
    /// Create bounds; `min` must not exceed `max`
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Bounds `[-max, max]`
    pub const fn symmetric(max: i32) -> Self {
        Self { min: -max, max }
    }

    /// Clamp a requested velocity into the bounds
    pub fn clamp(&self, velocity: i32) -> i32 {
        velocity.clamp(self.min, self.max)
    }

    /// Check if a velocity is within the bounds
    pub fn contains(&self, velocity: i32) -> bool {
        (self.min..=self.max).contains(&velocity)
    }
}

/// One physical (or simulated) motor driver board
pub trait MotorDriver {
    /// Board-level error
    type Error;

    /// Velocity bounds this board accepts
    fn speed_limits(&self) -> SpeedLimits;

    /// Drive one axis
    ///
    /// `velocity` is within [`speed_limits`](Self::speed_limits) and uses
    /// the positive = voltage-increasing convention. Zero brakes or
    /// coasts, depending on the board.
    fn drive(&mut self, axis: Axis, velocity: i32) -> Result<(), Self::Error>;

    /// Check the board fault indication
    ///
    /// Boards without a fault line always report `false`.
    fn fault(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }

    /// Release the board (disable outputs, put pins in a safe state)
    fn shutdown(&mut self) -> Result<(), Self::Error>;
}

/// Result of a reversal request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReverseOutcome {
    /// Velocity was negated and re-issued
    Reversed { velocity: i32 },
    /// Debounce interval has not elapsed; nothing changed
    Skipped,
}

impl ReverseOutcome {
    /// Check if the motor state changed
    pub fn is_reversed(&self) -> bool {
        matches!(self, ReverseOutcome::Reversed { .. })
    }
}

/// Capability set of a motor backend
///
/// Timestamps are monotonic milliseconds supplied by the caller, so the
/// debounce logic is independent of any clock implementation.
pub trait MotorBackend {
    /// Error from the underlying driver
    type Error;

    /// Velocity bounds of the active board
    fn speed_limits(&self) -> SpeedLimits;

    /// Command both axes
    ///
    /// Out-of-range requests are clamped and reported with
    /// [`Event::SpeedClamped`](crate::state::Event::SpeedClamped).
    /// Returns the velocities actually applied.
    fn set_velocity(
        &mut self,
        velocity: PerAxis<i32>,
        sink: &mut dyn EventSink,
    ) -> Result<PerAxis<i32>, Self::Error>;

    /// Currently commanded velocity of an axis
    fn velocity(&self, axis: Axis) -> i32;

    /// Currently commanded velocities
    fn velocities(&self) -> PerAxis<i32> {
        PerAxis::from_fn(|axis| self.velocity(axis))
    }

    /// Command a single axis, leaving the other one untouched
    fn set_axis_velocity(
        &mut self,
        axis: Axis,
        velocity: i32,
        sink: &mut dyn EventSink,
    ) -> Result<i32, Self::Error> {
        let mut request = self.velocities();
        request[axis] = velocity;
        self.set_velocity(request, sink).map(|applied| applied[axis])
    }

    /// Set the selected axes to zero velocity
    fn stop(&mut self, axes: AxisSet) -> Result<(), Self::Error>;

    /// Check if the debounce interval since the last reversal has elapsed
    fn should_reverse(&self, axis: Axis, now_ms: u32) -> bool;

    /// Negate the commanded velocity of an axis
    ///
    /// With `force == false` the request is skipped (and reported with
    /// [`Event::ReversalSkipped`](crate::state::Event::ReversalSkipped)) while
    /// [`should_reverse`](Self::should_reverse) is false. With
    /// `force == true` the reversal always happens.
    fn reverse(
        &mut self,
        axis: Axis,
        force: bool,
        now_ms: u32,
        sink: &mut dyn EventSink,
    ) -> Result<ReverseOutcome, Self::Error>;

    /// Check the driver fault indication, reporting `Event::DriverFault`
    fn fault(&mut self, sink: &mut dyn EventSink) -> Result<bool, Self::Error>;

    /// Release the hardware; the backend must not be commanded afterwards
    fn cleanup(&mut self) -> Result<(), Self::Error>;
}
