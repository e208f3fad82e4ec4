//! Generic motor backend
//!
//! Wraps one driver board and owns the per-axis motor state: the
//! commanded velocity and the time of the last reversal. All velocities
//! are in the external sign convention (positive = voltage-increasing);
//! polarity quirks of the boards live in the drivers.
//!
//! # Debounce
//!
//! A non-forced reversal is accepted only when `debounce_ms` has elapsed
//! since the previous reversal of the same axis. An axis that has never
//! been reversed is always eligible. Forced reversals bypass the check
//! and restart the interval.

use eigsep_core::config::MotorConfig;
use eigsep_core::state::{Event, EventSink};
use eigsep_core::traits::{MotorBackend, MotorDriver, ReverseOutcome, SpeedLimits};
use eigsep_core::{Axis, AxisSet, PerAxis};

/// Errors from the motor backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorError<E> {
    /// Error from the driver board
    Driver(E),
    /// Backend was already cleaned up
    Released,
}

impl<E> From<E> for MotorError<E> {
    fn from(err: E) -> Self {
        MotorError::Driver(err)
    }
}

impl<E: core::fmt::Debug> core::fmt::Display for MotorError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MotorError::Driver(err) => write!(f, "motor driver error: {:?}", err),
            MotorError::Released => f.write_str("motor backend already released"),
        }
    }
}

/// Motor backend over a driver board
pub struct Motor<D> {
    driver: D,
    config: MotorConfig,
    limits: SpeedLimits,
    /// Commanded velocity per axis
    velocity: PerAxis<i32>,
    /// Time of the last reversal per axis
    last_reversal_ms: PerAxis<Option<u32>>,
    released: bool,
}

impl<D: MotorDriver> Motor<D> {
    /// Wrap a driver; both axes start stopped
    pub fn new(driver: D, config: MotorConfig) -> Self {
        let limits = driver.speed_limits();
        Self {
            driver,
            config,
            limits,
            velocity: PerAxis::splat(0),
            last_reversal_ms: PerAxis::splat(None),
            released: false,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &MotorConfig {
        &self.config
    }

    /// Get access to the underlying driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Get mutable access to the underlying driver
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Check if [`cleanup`](MotorBackend::cleanup) already ran
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Time since the last reversal of an axis, `None` if never reversed
    pub fn since_last_reversal(&self, axis: Axis, now_ms: u32) -> Option<u32> {
        self.last_reversal_ms[axis].map(|t| now_ms.wrapping_sub(t))
    }

    fn ensure_active(&self) -> Result<(), MotorError<D::Error>> {
        if self.released {
            Err(MotorError::Released)
        } else {
            Ok(())
        }
    }

    fn apply(&mut self, velocity: PerAxis<i32>) -> Result<(), MotorError<D::Error>> {
        for axis in Axis::ALL {
            self.driver.drive(axis, velocity[axis])?;
            self.velocity[axis] = velocity[axis];
        }
        Ok(())
    }
}

impl<D: MotorDriver> MotorBackend for Motor<D> {
    type Error = MotorError<D::Error>;

    fn speed_limits(&self) -> SpeedLimits {
        self.limits
    }

    fn set_velocity(
        &mut self,
        velocity: PerAxis<i32>,
        sink: &mut dyn EventSink,
    ) -> Result<PerAxis<i32>, Self::Error> {
        self.ensure_active()?;

        let applied = velocity.map(|axis, requested| {
            let applied = self.limits.clamp(requested);
            if applied != requested {
                sink.report(Event::SpeedClamped {
                    axis,
                    requested,
                    applied,
                });
            }
            applied
        });

        self.apply(applied)?;
        Ok(applied)
    }

    fn velocity(&self, axis: Axis) -> i32 {
        self.velocity[axis]
    }

    fn stop(&mut self, axes: AxisSet) -> Result<(), Self::Error> {
        self.ensure_active()?;

        let mut velocity = self.velocity;
        for axis in axes.iter() {
            velocity[axis] = 0;
        }
        self.apply(velocity)
    }

    fn should_reverse(&self, axis: Axis, now_ms: u32) -> bool {
        match self.since_last_reversal(axis, now_ms) {
            Some(elapsed) => elapsed >= self.config.debounce_ms,
            None => true,
        }
    }

    fn reverse(
        &mut self,
        axis: Axis,
        force: bool,
        now_ms: u32,
        sink: &mut dyn EventSink,
    ) -> Result<ReverseOutcome, Self::Error> {
        self.ensure_active()?;

        if !force && !self.should_reverse(axis, now_ms) {
            sink.report(Event::ReversalSkipped {
                axis,
                since_last_ms: self.since_last_reversal(axis, now_ms).unwrap_or(0),
            });
            return Ok(ReverseOutcome::Skipped);
        }

        let mut request = self.velocity;
        request[axis] = -request[axis];
        let applied = self.set_velocity(request, sink)?;

        self.last_reversal_ms[axis] = Some(now_ms);
        sink.report(Event::Reversed {
            axis,
            forced: force,
            velocity: applied[axis],
        });
        Ok(ReverseOutcome::Reversed {
            velocity: applied[axis],
        })
    }

    fn fault(&mut self, sink: &mut dyn EventSink) -> Result<bool, Self::Error> {
        self.ensure_active()?;

        let fault = self.driver.fault()?;
        if fault {
            sink.report(Event::DriverFault);
        }
        Ok(fault)
    }

    fn cleanup(&mut self) -> Result<(), Self::Error> {
        if self.released {
            return Ok(());
        }
        let stopped = self.stop(AxisSet::BOTH);
        // release the board even if the stop command failed
        self.released = true;
        let shutdown = self.driver.shutdown().map_err(MotorError::Driver);
        stopped.and(shutdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Vec;

    /// Driver stand-in recording every drive call
    #[derive(Default)]
    struct MockDriver {
        drives: std::vec::Vec<(Axis, i32)>,
        fault: bool,
        shutdowns: u32,
        fail_drive: bool,
    }

    impl MotorDriver for MockDriver {
        type Error = ();

        fn speed_limits(&self) -> SpeedLimits {
            SpeedLimits::symmetric(480)
        }

        fn drive(&mut self, axis: Axis, velocity: i32) -> Result<(), ()> {
            if self.fail_drive {
                return Err(());
            }
            self.drives.push((axis, velocity));
            Ok(())
        }

        fn fault(&mut self) -> Result<bool, ()> {
            Ok(self.fault)
        }

        fn shutdown(&mut self) -> Result<(), ()> {
            self.shutdowns += 1;
            Ok(())
        }
    }

    fn motor() -> Motor<MockDriver> {
        Motor::new(MockDriver::default(), MotorConfig { debounce_ms: 5000 })
    }

    #[test]
    fn test_clamp_reports_event() {
        let mut m = motor();
        let mut events: Vec<Event, 8> = Vec::new();

        let applied = m.set_velocity(PerAxis::new(600, -100), &mut events).unwrap();
        assert_eq!(applied, PerAxis::new(480, -100));
        assert_eq!(m.velocity(Axis::Az), 480);
        assert_eq!(
            events.as_slice(),
            &[Event::SpeedClamped {
                axis: Axis::Az,
                requested: 600,
                applied: 480
            }]
        );
        assert_eq!(m.driver().drives, [(Axis::Az, 480), (Axis::Alt, -100)]);
    }

    #[test]
    fn test_first_reversal_allowed() {
        let mut m = motor();
        let mut events: Vec<Event, 8> = Vec::new();
        m.set_velocity(PerAxis::new(200, 0), &mut events).unwrap();

        // right at start-up, with no previous reversal
        assert!(m.should_reverse(Axis::Az, 0));
        let outcome = m.reverse(Axis::Az, false, 0, &mut events).unwrap();
        assert_eq!(outcome, ReverseOutcome::Reversed { velocity: -200 });
    }

    #[test]
    fn test_debounce_allows_one_of_two() {
        let mut m = motor();
        let mut events: Vec<Event, 8> = Vec::new();
        m.set_velocity(PerAxis::new(200, 150), &mut events).unwrap();

        let first = m.reverse(Axis::Az, false, 10_000, &mut events).unwrap();
        let second = m.reverse(Axis::Az, false, 14_999, &mut events).unwrap();

        assert!(first.is_reversed());
        assert_eq!(second, ReverseOutcome::Skipped);
        assert_eq!(m.velocity(Axis::Az), -200);
        assert_eq!(
            events.last(),
            Some(&Event::ReversalSkipped {
                axis: Axis::Az,
                since_last_ms: 4_999
            })
        );

        // other axis has its own interval
        assert!(m.reverse(Axis::Alt, false, 14_999, &mut events).unwrap().is_reversed());

        // interval elapsed
        assert!(m.reverse(Axis::Az, false, 15_000, &mut events).unwrap().is_reversed());
        assert_eq!(m.velocity(Axis::Az), 200);
    }

    #[test]
    fn test_forced_reversal_ignores_debounce() {
        let mut m = motor();
        let mut events: Vec<Event, 8> = Vec::new();
        m.set_velocity(PerAxis::new(-300, 0), &mut events).unwrap();

        m.reverse(Axis::Az, false, 1000, &mut events).unwrap();
        let outcome = m.reverse(Axis::Az, true, 1001, &mut events).unwrap();

        assert_eq!(outcome, ReverseOutcome::Reversed { velocity: -300 });
        assert_eq!(
            events.last(),
            Some(&Event::Reversed {
                axis: Axis::Az,
                forced: true,
                velocity: -300
            })
        );
        // forced reversal restarts the interval
        assert!(!m.should_reverse(Axis::Az, 5000));
        assert!(m.should_reverse(Axis::Az, 6001));
    }

    #[test]
    fn test_stop_selected_axes() {
        let mut m = motor();
        let mut events: Vec<Event, 8> = Vec::new();
        m.set_velocity(PerAxis::new(200, -200), &mut events).unwrap();

        m.stop(AxisSet::only(Axis::Alt)).unwrap();
        assert_eq!(m.velocities(), PerAxis::new(200, 0));

        m.stop(AxisSet::BOTH).unwrap();
        assert_eq!(m.velocities(), PerAxis::new(0, 0));
    }

    #[test]
    fn test_set_single_axis() {
        let mut m = motor();
        let mut events: Vec<Event, 8> = Vec::new();
        m.set_velocity(PerAxis::new(100, 100), &mut events).unwrap();

        let applied = m.set_axis_velocity(Axis::Alt, -900, &mut events).unwrap();
        assert_eq!(applied, -480);
        assert_eq!(m.velocities(), PerAxis::new(100, -480));
    }

    #[test]
    fn test_fault_reported() {
        let mut m = motor();
        let mut events: Vec<Event, 8> = Vec::new();

        assert!(!m.fault(&mut events).unwrap());
        m.driver_mut().fault = true;
        assert!(m.fault(&mut events).unwrap());
        assert_eq!(events.as_slice(), &[Event::DriverFault]);
    }

    #[test]
    fn test_cleanup_runs_once() {
        let mut m = motor();
        let mut events: Vec<Event, 8> = Vec::new();
        m.set_velocity(PerAxis::new(200, 200), &mut events).unwrap();

        m.cleanup().unwrap();
        m.cleanup().unwrap();

        assert!(m.is_released());
        assert_eq!(m.driver().shutdowns, 1);
        assert_eq!(m.velocities(), PerAxis::new(0, 0));
        assert_eq!(
            m.set_velocity(PerAxis::new(1, 1), &mut events),
            Err(MotorError::Released)
        );
    }

    #[test]
    fn test_driver_error_propagates() {
        let mut m = motor();
        let mut events: Vec<Event, 8> = Vec::new();
        m.driver_mut().fail_drive = true;

        assert_eq!(
            m.set_velocity(PerAxis::new(1, 1), &mut events),
            Err(MotorError::Driver(()))
        );
        // a failed cleanup still releases the board
        assert!(m.cleanup().is_err());
        assert_eq!(m.driver().shutdowns, 1);
    }
}
