//! Limit supervisor state machine
//!
//! Per axis:
//!
//! ```text
//!            mismatch (commanded != 0, sensed != 0, sensed != commanded)
//!   Clear ─────────────────────────────────────────────────────────────► Latched
//!     ▲                                                                    │
//!     │ settle_ms elapsed                        sensed == commanded       │
//!     │ (flag cleared)                           (forced reversal issued)  │
//!     └──────────────────────────── Recovering ◄───────────────────────────┘
//! ```
//!
//! `Latched` never reverses on its own: the motor is still pushing into
//! the obstruction. The forced reversal happens exactly once, on the
//! poll where the sensed direction agrees with the command again. A
//! `Stationary` reading while latched keeps the axis latched; the only
//! escape for a stuck axis is the debounced regular reversal path,
//! [`LimitSupervisor::release_stuck`], which goes straight back to `Clear`.

use crate::axis::{Axis, PerAxis};
use crate::config::{LatchPolicy, SupervisorConfig, VoltageRange};
use crate::sensor::Direction;
use crate::state::{Event, EventSink};
use crate::traits::{MotorBackend, ReverseOutcome};

use super::flag::LimitFlag;

/// Supervisor state of one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LimitState {
    /// Not at a limit
    #[default]
    Clear,
    /// Limit condition detected, flag set, waiting for the mismatch to resolve
    Latched,
    /// Forced reversal issued at `since_ms`, flag still set until settled
    Recovering { since_ms: u32 },
}

/// What a poll did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SupervisorAction {
    /// No transition
    None,
    /// `Clear -> Latched`
    Latched,
    /// `Latched -> Recovering`; the axis was force-reversed. The caller
    /// should re-seed the estimator for this axis and let it settle.
    ForceReversed { velocity: i32 },
    /// `Recovering -> Clear`
    Cleared,
}

/// Consistent sensor view of one axis for a single poll
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisReading {
    pub sensed: Direction,
    pub volts: Option<f32>,
}

impl AxisReading {
    pub const fn new(sensed: Direction, volts: Option<f32>) -> Self {
        Self { sensed, volts }
    }
}

/// Limit supervisor for both axes
#[derive(Debug, Clone)]
pub struct LimitSupervisor {
    config: SupervisorConfig,
    states: PerAxis<LimitState>,
}

impl LimitSupervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            states: PerAxis::splat(LimitState::Clear),
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Current state of an axis
    pub fn state(&self, axis: Axis) -> LimitState {
        self.states[axis]
    }

    /// Check if the axis is latched or still recovering
    pub fn is_active(&self, axis: Axis) -> bool {
        self.states[axis] != LimitState::Clear
    }

    /// Evaluate one axis
    ///
    /// The commanded direction is read from `motor`. `range` is only
    /// consulted by [`LatchPolicy::MismatchNearRange`].
    #[allow(clippy::too_many_arguments)]
    pub fn poll<M: MotorBackend>(
        &mut self,
        axis: Axis,
        reading: AxisReading,
        range: Option<&VoltageRange>,
        motor: &mut M,
        flag: &LimitFlag,
        now_ms: u32,
        sink: &mut dyn EventSink,
    ) -> Result<SupervisorAction, M::Error> {
        let commanded = Direction::of_velocity(motor.velocity(axis));

        match self.states[axis] {
            LimitState::Clear => {
                if self.is_limit_condition(commanded, reading, range) {
                    flag.set();
                    self.states[axis] = LimitState::Latched;
                    sink.report(Event::LimitLatched {
                        axis,
                        commanded,
                        sensed: reading.sensed,
                    });
                    return Ok(SupervisorAction::Latched);
                }
                Ok(SupervisorAction::None)
            }
            LimitState::Latched => {
                if commanded.is_moving() && reading.sensed == commanded {
                    let outcome = motor.reverse(axis, true, now_ms, sink)?;
                    self.states[axis] = LimitState::Recovering { since_ms: now_ms };
                    sink.report(Event::LimitRecovering { axis });
                    let velocity = match outcome {
                        ReverseOutcome::Reversed { velocity } => velocity,
                        ReverseOutcome::Skipped => motor.velocity(axis),
                    };
                    return Ok(SupervisorAction::ForceReversed { velocity });
                }
                Ok(SupervisorAction::None)
            }
            LimitState::Recovering { since_ms } => {
                if now_ms.wrapping_sub(since_ms) >= self.config.settle_ms {
                    flag.clear();
                    self.states[axis] = LimitState::Clear;
                    sink.report(Event::LimitCleared { axis });
                    return Ok(SupervisorAction::Cleared);
                }
                Ok(SupervisorAction::None)
            }
        }
    }

    /// Evaluate both axes
    pub fn poll_all<M: MotorBackend>(
        &mut self,
        readings: PerAxis<AxisReading>,
        ranges: Option<&PerAxis<VoltageRange>>,
        motor: &mut M,
        flags: &PerAxis<LimitFlag>,
        now_ms: u32,
        sink: &mut dyn EventSink,
    ) -> Result<PerAxis<SupervisorAction>, M::Error> {
        let mut actions = PerAxis::splat(SupervisorAction::None);
        for axis in Axis::ALL {
            actions[axis] = self.poll(
                axis,
                readings[axis],
                ranges.map(|r| &r[axis]),
                motor,
                &flags[axis],
                now_ms,
                sink,
            )?;
        }
        Ok(actions)
    }

    /// Debounced escape for a latched axis that is stuck
    ///
    /// An axis pinned against its end stop may never report the sensed
    /// direction that triggers the forced reversal. The caller decides the
    /// axis is stuck (stalled, or at a soft limit) and this issues the
    /// regular, debounce-protected reversal. When the motor reverses the
    /// latch is released; returns `true` in that case.
    pub fn release_stuck<M: MotorBackend>(
        &mut self,
        axis: Axis,
        motor: &mut M,
        flag: &LimitFlag,
        now_ms: u32,
        sink: &mut dyn EventSink,
    ) -> Result<bool, M::Error> {
        if self.states[axis] != LimitState::Latched {
            return Ok(false);
        }
        if !motor.reverse(axis, false, now_ms, sink)?.is_reversed() {
            return Ok(false);
        }
        flag.clear();
        self.states[axis] = LimitState::Clear;
        sink.report(Event::LimitCleared { axis });
        Ok(true)
    }

    /// Forget any latched state (flags are cleared too)
    pub fn reset(&mut self, flags: &PerAxis<LimitFlag>) {
        for axis in Axis::ALL {
            self.states[axis] = LimitState::Clear;
            flags[axis].clear();
        }
    }

    fn is_limit_condition(
        &self,
        commanded: Direction,
        reading: AxisReading,
        range: Option<&VoltageRange>,
    ) -> bool {
        // a stationary pot is never evidence of a limit
        if !commanded.is_moving() || !reading.sensed.is_moving() {
            return false;
        }
        if reading.sensed == commanded {
            return false;
        }

        match self.config.policy {
            LatchPolicy::Mismatch => true,
            LatchPolicy::MismatchNearRange { margin } => match (range, reading.volts) {
                (Some(range), Some(volts)) => range.near_end(volts, margin),
                // without a calibrated range, fall back to mismatch alone
                _ => true,
            },
        }
    }
}
