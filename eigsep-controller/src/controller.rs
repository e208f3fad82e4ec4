//! Control activity
//!
//! One tick, in order:
//!
//! 1. driver fault check
//! 2. limit supervision on a consistent sensor snapshot
//! 3. soft-limit reversal requests (debounced)
//! 4. stall monitoring, optionally escalated to forced reversals
//! 5. debounced escape for latched axes that are stalled or at a soft limit
//! 6. optional PID trim toward a target voltage
//!
//! Every direction change the controller issues re-seeds the estimator
//! of that axis, so stale samples from before the change cannot latch a
//! limit against the new command.

use core::fmt::Debug;

use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Instant, Ticker, Timer};

use eigsep_core::config::{
    AxisRanges, ControlConfig, RegulatorConfig, StallConfig, SupervisorConfig,
};
use eigsep_core::control::VelocityRegulator;
use eigsep_core::safety::StallMonitor;
use eigsep_core::sensor::Direction;
use eigsep_core::state::EventSink;
use eigsep_core::supervisor::{AxisReading, LimitState, LimitSupervisor, SupervisorAction};
use eigsep_core::traits::MotorBackend;
use eigsep_core::{Axis, AxisSet, PerAxis};

use crate::error::{ControllerError, ControllerResult};
use crate::shared::{SensorSnapshot, SharedState};

/// Result of one controller tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickOutcome {
    /// Axes force-reversed this tick
    pub forced: AxisSet,
    /// Driver reported a fault
    pub fault: bool,
}

/// Settings the controller is built from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    pub control: ControlConfig,
    pub supervisor: SupervisorConfig,
    pub stall: StallConfig,
    pub regulator: RegulatorConfig,
}

/// Controller step logic
pub struct Controller {
    control: ControlConfig,
    supervisor: LimitSupervisor,
    stall: StallMonitor,
    regulator: VelocityRegulator,
    regulate: bool,
    ranges: Option<AxisRanges>,
    supervise: bool,
}

impl Controller {
    pub fn new(config: &ControllerConfig, ranges: Option<AxisRanges>) -> Self {
        Self {
            control: config.control,
            supervisor: LimitSupervisor::new(config.supervisor),
            stall: StallMonitor::new(config.stall),
            regulator: VelocityRegulator::new(&config.regulator),
            regulate: config.regulator.is_active(),
            ranges,
            supervise: true,
        }
    }

    /// Controller that only watches for driver faults
    pub fn unsupervised(mut self) -> Self {
        self.supervise = false;
        self
    }

    pub fn is_supervising(&self) -> bool {
        self.supervise
    }

    pub fn supervisor(&self) -> &LimitSupervisor {
        &self.supervisor
    }

    pub fn stall(&self) -> &StallMonitor {
        &self.stall
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.control.period_ms as u64)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.supervisor.config().settle_ms as u64)
    }

    /// Run one tick against `snapshot`
    pub fn tick<M: MotorBackend>(
        &mut self,
        snapshot: &SensorSnapshot,
        motor: &mut M,
        shared: &SharedState,
        now_ms: u32,
        sink: &mut dyn EventSink,
    ) -> Result<TickOutcome, M::Error> {
        let mut outcome = TickOutcome {
            fault: motor.fault(sink)?,
            ..Default::default()
        };
        if !self.supervise {
            return Ok(outcome);
        }

        let readings = PerAxis::from_fn(|axis| {
            AxisReading::new(snapshot.directions[axis], snapshot.volts.map(|v| v[axis]))
        });
        let actions = self.supervisor.poll_all(
            readings,
            self.ranges.as_ref(),
            motor,
            &shared.limits,
            now_ms,
            sink,
        )?;
        for axis in Axis::ALL {
            if let SupervisorAction::ForceReversed { .. } = actions[axis] {
                outcome.forced.insert(axis);
                self.regulator.reset(axis);
                self.direction_changed(axis, shared);
            }
        }

        self.soft_limits(snapshot, motor, shared, outcome.forced, now_ms, sink)?;
        self.stalls(snapshot, motor, shared, &mut outcome, now_ms, sink)?;
        self.stuck(snapshot, motor, shared, now_ms, sink)?;
        if self.regulate {
            self.trim(snapshot, motor, shared, outcome.forced, now_ms, sink)?;
        }
        Ok(outcome)
    }

    fn soft_limits<M: MotorBackend>(
        &mut self,
        snapshot: &SensorSnapshot,
        motor: &mut M,
        shared: &SharedState,
        forced: AxisSet,
        now_ms: u32,
        sink: &mut dyn EventSink,
    ) -> Result<(), M::Error> {
        for axis in Axis::ALL {
            if !snapshot.reverse_requested[axis]
                || forced.contains(axis)
                || self.supervisor.is_active(axis)
            {
                continue;
            }
            // only an axis driving toward the end it reached
            let commanded = Direction::of_velocity(motor.velocity(axis));
            if commanded != snapshot.directions[axis] {
                continue;
            }
            // the sampler re-latches the request while the condition holds
            if !motor.should_reverse(axis, now_ms) {
                continue;
            }
            if motor.reverse(axis, false, now_ms, sink)?.is_reversed() {
                self.direction_changed(axis, shared);
            }
        }
        Ok(())
    }

    fn stalls<M: MotorBackend>(
        &mut self,
        snapshot: &SensorSnapshot,
        motor: &mut M,
        shared: &SharedState,
        outcome: &mut TickOutcome,
        now_ms: u32,
        sink: &mut dyn EventSink,
    ) -> Result<(), M::Error> {
        let mut stalled = false;
        for axis in Axis::ALL {
            if matches!(self.supervisor.state(axis), LimitState::Recovering { .. }) {
                self.stall.rearm(axis);
                continue;
            }
            stalled |= self.stall.update(
                axis,
                motor.velocity(axis),
                snapshot.directions[axis],
                now_ms,
                sink,
            );
        }

        if !stalled || !self.stall.config().reverse_on_stall {
            return Ok(());
        }
        for axis in Axis::ALL {
            if motor.velocity(axis) == 0
                || outcome.forced.contains(axis)
                || self.supervisor.is_active(axis)
            {
                continue;
            }
            motor.reverse(axis, true, now_ms, sink)?;
            outcome.forced.insert(axis);
            self.regulator.reset(axis);
            self.direction_changed(axis, shared);
        }
        Ok(())
    }

    fn stuck<M: MotorBackend>(
        &mut self,
        snapshot: &SensorSnapshot,
        motor: &mut M,
        shared: &SharedState,
        now_ms: u32,
        sink: &mut dyn EventSink,
    ) -> Result<(), M::Error> {
        for axis in Axis::ALL {
            if self.supervisor.state(axis) != LimitState::Latched {
                continue;
            }
            if !self.stall.is_stalled(axis) && !snapshot.reverse_requested[axis] {
                continue;
            }
            // stays latched until the debounce interval allows a reversal
            if !motor.should_reverse(axis, now_ms) {
                continue;
            }
            if self
                .supervisor
                .release_stuck(axis, motor, &shared.limits[axis], now_ms, sink)?
            {
                log::warn!("{}: stuck at limit, reversed", axis);
                self.regulator.reset(axis);
                self.direction_changed(axis, shared);
            }
        }
        Ok(())
    }

    fn trim<M: MotorBackend>(
        &mut self,
        snapshot: &SensorSnapshot,
        motor: &mut M,
        shared: &SharedState,
        forced: AxisSet,
        now_ms: u32,
        sink: &mut dyn EventSink,
    ) -> Result<(), M::Error> {
        let Some(volts) = snapshot.volts else {
            return Ok(());
        };
        let limits = motor.speed_limits();
        for axis in Axis::ALL {
            if forced.contains(axis) || self.supervisor.is_active(axis) {
                self.regulator.reset(axis);
                continue;
            }
            let Some(velocity) = self.regulator.command(axis, volts[axis], now_ms, limits) else {
                continue;
            };
            let current = motor.velocity(axis);
            if (velocity - current).abs() < self.control.trim_deadband {
                continue;
            }
            let applied = motor.set_axis_velocity(axis, velocity, sink)?;
            log::debug!("{}: trimmed velocity {} -> {}", axis, current, applied);
            if Direction::of_velocity(applied) != Direction::of_velocity(current) {
                self.direction_changed(axis, shared);
            }
        }
        Ok(())
    }

    fn direction_changed(&mut self, axis: Axis, shared: &SharedState) {
        shared.reseed(axis);
        self.stall.rearm(axis);
    }
}

/// Owns the motor backend and releases it exactly once
///
/// [`release`](Self::release) stops both axes and cleans up the backend.
/// Dropping an unreleased guard does the same, logging any error.
pub struct MotorGuard<M>
where
    M: MotorBackend,
    M::Error: Debug,
{
    motor: M,
    released: bool,
}

impl<M> MotorGuard<M>
where
    M: MotorBackend,
    M::Error: Debug,
{
    pub fn new(motor: M) -> Self {
        Self {
            motor,
            released: false,
        }
    }

    pub fn motor(&mut self) -> &mut M {
        &mut self.motor
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Stop and clean up; later calls are no-ops
    pub fn release(&mut self) -> Result<(), M::Error> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        // cleanup runs even when stop fails
        let stopped = self.motor.stop(AxisSet::BOTH);
        let cleaned = self.motor.cleanup();
        log::info!("Motors stopped and released");
        stopped.and(cleaned)
    }
}

impl<M> Drop for MotorGuard<M>
where
    M: MotorBackend,
    M::Error: Debug,
{
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            log::error!("Motor release failed: {:?}", err);
        }
    }
}

/// Controller loop; returns once shutdown is requested or on a fatal error
///
/// The motors are released before returning, and shutdown is requested
/// so the sampler ends too.
pub async fn run_controller<M>(
    mut controller: Controller,
    guard: &mut MotorGuard<M>,
    shared: &SharedState,
    sink: &mut dyn EventSink,
) -> ControllerResult<()>
where
    M: MotorBackend,
    M::Error: Debug,
{
    log::info!(
        "Controller started (az {}, alt {}{})",
        guard.motor().velocity(Axis::Az),
        guard.motor().velocity(Axis::Alt),
        if controller.is_supervising() {
            ""
        } else {
            ", unsupervised"
        }
    );

    let mut ticker = Ticker::every(controller.period());
    let result = loop {
        if let Either::Second(()) = select(ticker.next(), shared.shutdown.wait()).await {
            log::info!("Shutdown requested");
            break Ok(());
        }

        let snapshot = shared.snapshot();
        let now_ms = Instant::now().as_millis() as u32;
        let outcome = match controller.tick(&snapshot, guard.motor(), shared, now_ms, sink) {
            Ok(outcome) => outcome,
            Err(err) => break Err(ControllerError::motor(err)),
        };
        if outcome.fault {
            break Err(ControllerError::Motor("driver fault".into()));
        }

        if !outcome.forced.is_empty() {
            // let the reversed motor get moving before the next evaluation
            if let Either::Second(()) =
                select(Timer::after(controller.settle()), shared.shutdown.wait()).await
            {
                log::info!("Shutdown requested");
                break Ok(());
            }
            ticker.reset();
        }
    };

    shared.shutdown.request();
    let released = guard.release().map_err(ControllerError::motor);
    result.and(released)
}
