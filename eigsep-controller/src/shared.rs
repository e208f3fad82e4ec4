//! State shared between the sampler and the controller
//!
//! The sampler is the only writer of the sensor state; the controller
//! reads it once per tick through [`SharedState::snapshot`], so a tick
//! never sees a half-appended history. Limit flags are atomics and can be
//! read from anywhere.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;

use eigsep_core::config::EstimatorConfig;
use eigsep_core::sensor::{Direction, DirectionEstimator};
use eigsep_core::supervisor::LimitFlags;
use eigsep_core::{Axis, PerAxis};

/// Sensor-side state, written by the sampler
#[derive(Debug, Clone)]
pub struct SensorState {
    pub estimator: DirectionEstimator,
    /// Latest voltages, `None` until the first sample
    pub volts: Option<PerAxis<f32>>,
    /// Soft-limit reversal requests, latched until the controller takes them
    pub reverse_requested: PerAxis<bool>,
    /// Samples recorded this session
    pub samples: u64,
}

impl SensorState {
    pub fn new(config: &EstimatorConfig) -> Self {
        Self {
            estimator: DirectionEstimator::from_config(config),
            volts: None,
            reverse_requested: PerAxis::splat(false),
            samples: 0,
        }
    }
}

/// Consistent view of the sensor state for one controller tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
    pub directions: PerAxis<Direction>,
    pub volts: Option<PerAxis<f32>>,
    /// Estimator window full
    pub warm: PerAxis<bool>,
    /// Soft-limit reversal requested since the last snapshot
    pub reverse_requested: PerAxis<bool>,
}

/// Cooperative shutdown token
pub struct Shutdown {
    requested: AtomicBool,
    signal: Signal<CriticalSectionRawMutex, ()>,
}

impl Shutdown {
    pub const fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
            signal: Signal::new(),
        }
    }

    /// Request shutdown; safe to call from any thread, any number of times
    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
        self.signal.signal(());
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Wait until shutdown is requested
    ///
    /// Only one task may wait at a time; others poll [`is_requested`](Self::is_requested).
    pub async fn wait(&self) {
        while !self.is_requested() {
            self.signal.wait().await;
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything both activities share
pub struct SharedState {
    sensor: Mutex<CriticalSectionRawMutex, RefCell<SensorState>>,
    pub limits: LimitFlags,
    pub shutdown: Shutdown,
}

impl SharedState {
    pub fn new(config: &EstimatorConfig) -> Self {
        Self {
            sensor: Mutex::new(RefCell::new(SensorState::new(config))),
            limits: LimitFlags::cleared(),
            shutdown: Shutdown::new(),
        }
    }

    /// Run `f` with exclusive access to the sensor state
    pub fn with_sensor<R>(&self, f: impl FnOnce(&mut SensorState) -> R) -> R {
        self.sensor.lock(|sensor| f(&mut sensor.borrow_mut()))
    }

    /// Take a snapshot, consuming pending soft-limit requests
    pub fn snapshot(&self) -> SensorSnapshot {
        self.with_sensor(|sensor| {
            let reverse_requested = sensor.reverse_requested;
            sensor.reverse_requested = PerAxis::splat(false);
            SensorSnapshot {
                directions: sensor.estimator.directions(),
                volts: sensor.volts,
                warm: PerAxis::from_fn(|axis| sensor.estimator.is_warm(axis)),
                reverse_requested,
            }
        })
    }

    /// Drop the direction history of an axis
    ///
    /// Samples taken before a commanded direction change would read as a
    /// mismatch against the new command.
    pub fn reseed(&self, axis: Axis) {
        self.with_sensor(|sensor| {
            sensor.estimator.reseed(axis);
            sensor.reverse_requested[axis] = false;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warm_forward(shared: &SharedState, axis: Axis) {
        shared.with_sensor(|sensor| {
            for i in 0..5 {
                sensor.estimator.record(axis, 1.0 + 0.01 * i as f32);
            }
        });
    }

    #[test]
    fn test_snapshot_takes_requests() {
        let shared = SharedState::new(&EstimatorConfig::default());
        shared.with_sensor(|sensor| sensor.reverse_requested[Axis::Az] = true);
        assert!(shared.snapshot().reverse_requested[Axis::Az]);
        assert!(!shared.snapshot().reverse_requested[Axis::Az]);
    }

    #[test]
    fn test_reseed_reports_stationary() {
        let shared = SharedState::new(&EstimatorConfig::default());
        warm_forward(&shared, Axis::Alt);
        let snapshot = shared.snapshot();
        assert_eq!(snapshot.directions[Axis::Alt], Direction::Forward);
        assert!(snapshot.warm[Axis::Alt]);

        shared.reseed(Axis::Alt);
        let snapshot = shared.snapshot();
        assert_eq!(snapshot.directions[Axis::Alt], Direction::Stationary);
        assert!(!snapshot.warm[Axis::Alt]);
    }

    #[test]
    fn test_shutdown_is_sticky() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_requested());
        shutdown.request();
        shutdown.request();
        assert!(shutdown.is_requested());
        embassy_futures::block_on(shutdown.wait());
    }
}
