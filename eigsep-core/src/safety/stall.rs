//! Stall detection
//!
//! An axis that is commanded to move but whose pot reports no motion for
//! `timeout_ms` is considered stalled. A stall is reported once and stays
//! set until the pot moves, the command drops to zero or the axis is
//! re-armed after a direction change.

use crate::axis::{Axis, PerAxis};
use crate::config::StallConfig;
use crate::sensor::Direction;
use crate::state::{Event, EventSink};

/// Per-axis stall monitor
#[derive(Debug, Clone)]
pub struct StallMonitor {
    config: StallConfig,
    /// Start of the current no-motion window
    stationary_since: PerAxis<Option<u32>>,
    stalled: PerAxis<bool>,
}

impl StallMonitor {
    pub fn new(config: StallConfig) -> Self {
        Self {
            config,
            stationary_since: PerAxis::splat(None),
            stalled: PerAxis::splat(false),
        }
    }

    pub fn config(&self) -> &StallConfig {
        &self.config
    }

    /// Check if an axis is currently considered stalled
    pub fn is_stalled(&self, axis: Axis) -> bool {
        self.stalled[axis]
    }

    /// Feed one observation
    ///
    /// Returns `true` only on the call that detects a new stall.
    pub fn update(
        &mut self,
        axis: Axis,
        commanded_velocity: i32,
        sensed: Direction,
        now_ms: u32,
        sink: &mut dyn EventSink,
    ) -> bool {
        if commanded_velocity == 0 {
            self.stationary_since[axis] = None;
            self.stalled[axis] = false;
            return false;
        }

        if sensed.is_moving() {
            self.stationary_since[axis] = None;
            if self.stalled[axis] {
                self.stalled[axis] = false;
                sink.report(Event::StallCleared { axis });
            }
            return false;
        }

        if self.stalled[axis] {
            return false;
        }
        let since = *self.stationary_since[axis].get_or_insert(now_ms);
        let stationary_ms = now_ms.wrapping_sub(since);
        if stationary_ms < self.config.timeout_ms {
            return false;
        }

        self.stalled[axis] = true;
        sink.report(Event::StallDetected {
            axis,
            stationary_ms,
        });
        true
    }

    /// Forget the no-motion window of an axis
    ///
    /// Called after the axis was deliberately re-commanded (forced
    /// reversal) so the estimator warm-up is not counted as a stall.
    pub fn rearm(&mut self, axis: Axis) {
        self.stationary_since[axis] = None;
        self.stalled[axis] = false;
    }
}
