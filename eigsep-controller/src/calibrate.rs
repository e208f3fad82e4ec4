//! Voltage range calibration
//!
//! Each selected axis is driven into its forward end stop, then into its
//! reverse end stop. A sweep toward one end goes through these phases:
//!
//! ```text
//! Leaving ──(moving toward the end)──► Approaching ──(pushed back)──► PushedBack ──► Done
//!                                          │  ▲                            ▲
//!                               (stopped)  ▼  │ (moving again)             │
//!                                         Settling ───(pushed back)────────┘
//! ```
//!
//! `Leaving` waits out a switch that is still engaged from a previous
//! sweep. The voltage extremum seen after `Leaving` is the measured end.
//! The stored range is the measured span shrunk by `delta` at both ends.

use core::fmt::Debug;

use embassy_time::{Duration, Instant};

use eigsep_core::config::{AxisRanges, EstimatorConfig, VoltageRange};
use eigsep_core::sensor::{Direction, DirectionEstimator, VoltageConverter};
use eigsep_core::state::EventSink;
use eigsep_core::traits::{MotorBackend, RangeStore, SampleSource};
use eigsep_core::{Axis, AxisSet, PerAxis};

use crate::config::CalibrationConfig;
use crate::error::{ControllerError, ControllerResult};
use crate::shared::Shutdown;

/// Phase of one sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepPhase {
    Leaving,
    Approaching,
    Settling,
    PushedBack,
    Done,
}

/// Sweep toward one end stop
#[derive(Debug, Clone)]
pub struct Sweep {
    toward: Direction,
    phase: SweepPhase,
    extremum: Option<f32>,
}

impl Sweep {
    /// `toward` must be `Forward` or `Reverse`
    pub fn new(toward: Direction) -> Self {
        Self {
            toward,
            phase: SweepPhase::Leaving,
            extremum: None,
        }
    }

    pub fn phase(&self) -> SweepPhase {
        self.phase
    }

    /// Furthest voltage seen toward the end stop
    pub fn extremum(&self) -> Option<f32> {
        self.extremum
    }

    /// Feed one warm estimator reading
    pub fn step(&mut self, sensed: Direction, volts: f32) -> SweepPhase {
        let toward = sensed == self.toward;
        let away = sensed == self.toward.reversed();

        self.phase = match self.phase {
            SweepPhase::Leaving if toward => SweepPhase::Approaching,
            SweepPhase::Leaving => SweepPhase::Leaving,
            SweepPhase::Approaching | SweepPhase::Settling if away => SweepPhase::PushedBack,
            SweepPhase::Approaching | SweepPhase::Settling if toward => SweepPhase::Approaching,
            SweepPhase::Approaching | SweepPhase::Settling => SweepPhase::Settling,
            SweepPhase::PushedBack if away => SweepPhase::PushedBack,
            SweepPhase::PushedBack | SweepPhase::Done => SweepPhase::Done,
        };

        if self.phase != SweepPhase::Leaving {
            let further = match self.extremum {
                None => true,
                Some(e) if self.toward == Direction::Forward => volts > e,
                Some(e) => volts < e,
            };
            if further {
                self.extremum = Some(volts);
            }
        }
        self.phase
    }
}

/// Calibration run over a motor backend and a sample source
pub struct Calibrator<'a, M, S> {
    motor: &'a mut M,
    source: &'a mut S,
    converter: VoltageConverter,
    estimator: DirectionEstimator,
    config: &'a CalibrationConfig,
    shutdown: &'a Shutdown,
}

impl<'a, M, S> Calibrator<'a, M, S>
where
    M: MotorBackend,
    M::Error: Debug,
    S: SampleSource,
{
    pub fn new(
        motor: &'a mut M,
        source: &'a mut S,
        converter: VoltageConverter,
        estimator: &EstimatorConfig,
        config: &'a CalibrationConfig,
        shutdown: &'a Shutdown,
    ) -> Self {
        Self {
            motor,
            source,
            converter,
            estimator: DirectionEstimator::from_config(estimator),
            config,
            shutdown,
        }
    }

    /// Signed sweep velocity toward `toward`
    fn sweep_velocity(&self, toward: Direction) -> i32 {
        let limits = self.motor.speed_limits();
        match (toward, self.config.velocity) {
            (Direction::Reverse, Some(v)) => -v,
            (Direction::Reverse, None) => limits.min,
            (_, Some(v)) => v,
            (_, None) => limits.max,
        }
    }

    /// Drive `axis` toward one end stop and return the extremum voltage
    pub async fn sweep(
        &mut self,
        axis: Axis,
        toward: Direction,
        sink: &mut dyn EventSink,
    ) -> ControllerResult<f32> {
        let velocity = self.sweep_velocity(toward);
        self.motor
            .stop(AxisSet::BOTH)
            .map_err(ControllerError::motor)?;
        self.motor
            .set_axis_velocity(axis, velocity, sink)
            .map_err(ControllerError::motor)?;
        self.estimator.reseed(axis);
        log::info!("{}: sweeping {:?} at {}", axis, toward, velocity);

        let deadline =
            Instant::now() + Duration::from_millis(self.config.sweep_timeout_ms as u64);
        let mut sweep = Sweep::new(toward);
        loop {
            if self.shutdown.is_requested() {
                return Err(ControllerError::Calibration {
                    axis,
                    reason: "interrupted",
                });
            }
            if Instant::now() >= deadline {
                return Err(ControllerError::Calibration {
                    axis,
                    reason: "end stop not reached before the sweep timeout",
                });
            }

            let raw = match self.source.next_sample().await {
                Ok(raw) => raw,
                Err(err) => {
                    log::debug!("Sample read failed: {}", err);
                    continue;
                }
            };
            let volts = self.converter.convert(raw)[axis];
            self.estimator.record(axis, volts);
            if !self.estimator.is_warm(axis) {
                continue;
            }
            let before = sweep.phase();
            let phase = sweep.step(self.estimator.direction(axis), volts);
            if phase != before {
                log::debug!("{}: {:?} at {:.3} V", axis, phase, volts);
            }
            if phase == SweepPhase::Done {
                break;
            }
        }

        self.motor
            .stop(AxisSet::only(axis))
            .map_err(ControllerError::motor)?;
        sweep.extremum().ok_or(ControllerError::Calibration {
            axis,
            reason: "no voltage recorded",
        })
    }

    /// Measure the range of one axis
    pub async fn calibrate_axis(
        &mut self,
        axis: Axis,
        sink: &mut dyn EventSink,
    ) -> ControllerResult<VoltageRange> {
        let max = self.sweep(axis, Direction::Forward, sink).await?;
        let min = self.sweep(axis, Direction::Reverse, sink).await?;
        let measured = VoltageRange::new(axis, min, max)?;
        let range = measured.shrink(axis, self.config.delta)?;
        log::info!(
            "{}: measured {:.3}..{:.3} V, using {:.3}..{:.3} V",
            axis,
            measured.min(),
            measured.max(),
            range.min(),
            range.max()
        );
        Ok(range)
    }

    /// Calibrate the selected axes on top of `base`
    pub async fn calibrate(
        &mut self,
        axes: AxisSet,
        base: AxisRanges,
        sink: &mut dyn EventSink,
    ) -> ControllerResult<AxisRanges> {
        if axes.is_empty() {
            return Err(ControllerError::NoAxisSelected);
        }
        let mut ranges = base;
        for axis in axes.iter() {
            ranges[axis] = self.calibrate_axis(axis, sink).await?;
        }
        Ok(ranges)
    }
}

/// Calibrate and persist
///
/// Axes that are not selected keep their stored range (or the default).
pub async fn calibrate_and_store<M, S, R>(
    calibrator: &mut Calibrator<'_, M, S>,
    axes: AxisSet,
    store: &mut R,
    sink: &mut dyn EventSink,
) -> ControllerResult<AxisRanges>
where
    M: MotorBackend,
    M::Error: Debug,
    S: SampleSource,
    R: RangeStore<Error = ControllerError>,
{
    let base = store.load()?.unwrap_or_else(|| PerAxis::splat(VoltageRange::default()));
    let ranges = calibrator.calibrate(axes, base, sink).await?;
    store.store(&ranges)?;
    Ok(ranges)
}
