//! PID velocity regulator
//!
//! Drives an axis toward a target pot voltage. The error is in volts and
//! the output is a signed velocity in backend units, so a positive error
//! (target above the measurement) yields a voltage-increasing command.
//!
//! Time is measured between calls from the caller's millisecond clock.
//! The first update after creation or reset has no elapsed time, which
//! skips the integral and derivative contributions.

use crate::axis::{Axis, PerAxis};
use crate::config::RegulatorConfig;
use crate::traits::SpeedLimits;

/// PID coefficients
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl PidGains {
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self { kp, ki, kd }
    }

    /// Check if any coefficient is non-zero
    pub fn is_configured(&self) -> bool {
        self.kp != 0.0 || self.ki != 0.0 || self.kd != 0.0
    }
}

/// Single-channel PID controller
#[derive(Debug, Clone)]
pub struct Pid {
    gains: PidGains,
    integral_limit: f32,
    integral: f32,
    last_error: f32,
    last_ms: Option<u32>,
}

impl Pid {
    /// A non-positive (or NaN) `integral_limit` disables the integral term
    pub fn new(gains: PidGains, integral_limit: f32) -> Self {
        Self {
            gains,
            integral_limit: if integral_limit > 0.0 { integral_limit } else { 0.0 },
            integral: 0.0,
            last_error: 0.0,
            last_ms: None,
        }
    }

    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    /// Accumulated integral (V·s)
    pub fn integral(&self) -> f32 {
        self.integral
    }

    /// Clear integrator and derivative history
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
        self.last_ms = None;
    }

    /// Compute the controller output
    pub fn update(&mut self, setpoint: f32, measured: f32, now_ms: u32) -> f32 {
        let error = setpoint - measured;
        let dt = match self.last_ms {
            Some(last) => now_ms.wrapping_sub(last) as f32 / 1000.0,
            None => 0.0,
        };

        self.integral = (self.integral + error * dt).clamp(-self.integral_limit, self.integral_limit);

        let derivative = if dt > 0.0 {
            (error - self.last_error) / dt
        } else {
            0.0
        };

        self.last_error = error;
        self.last_ms = Some(now_ms);

        self.gains.kp * error + self.gains.ki * self.integral + self.gains.kd * derivative
    }
}

/// Per-axis velocity regulator
#[derive(Debug, Clone)]
pub struct VelocityRegulator {
    pids: PerAxis<Pid>,
    targets: PerAxis<Option<f32>>,
}

impl VelocityRegulator {
    pub fn new(config: &RegulatorConfig) -> Self {
        let gains = PidGains::new(config.kp, config.ki, config.kd);
        Self {
            pids: PerAxis::from_fn(|_| Pid::new(gains, config.integral_limit)),
            targets: config.target,
        }
    }

    /// Target voltage of an axis
    pub fn target(&self, axis: Axis) -> Option<f32> {
        self.targets[axis]
    }

    /// Change the target voltage; the axis controller is reset
    pub fn set_target(&mut self, axis: Axis, target: Option<f32>) {
        self.targets[axis] = target;
        self.pids[axis].reset();
    }

    /// Reset the axis controller (after an externally forced jump)
    pub fn reset(&mut self, axis: Axis) {
        self.pids[axis].reset();
    }

    /// Regulated velocity for an axis
    ///
    /// `None` when the axis has no target. The output is truncated to an
    /// integer and clamped into `limits`.
    pub fn command(
        &mut self,
        axis: Axis,
        measured: f32,
        now_ms: u32,
        limits: SpeedLimits,
    ) -> Option<i32> {
        let target = self.targets[axis]?;
        let output = self.pids[axis].update(target, measured, now_ms);
        let output = output.clamp(limits.min as f32, limits.max as f32);
        Some(output as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_proportional_only() {
        let mut pid = Pid::new(PidGains::new(100.0, 0.0, 0.0), 10.0);
        assert!(approx(pid.update(1.5, 1.0, 0), 50.0));
        assert!(approx(pid.update(1.0, 1.5, 100), -50.0));
    }

    #[test]
    fn test_first_update_skips_derivative() {
        let mut pid = Pid::new(PidGains::new(0.0, 0.0, 1.0), 10.0);
        assert_eq!(pid.update(2.0, 1.0, 5000), 0.0);

        // error 1.0 -> 0.5 over 0.5 s
        assert!(approx(pid.update(1.5, 1.0, 5500), -1.0));
    }

    #[test]
    fn test_zero_dt_skips_derivative() {
        let mut pid = Pid::new(PidGains::new(0.0, 0.0, 1.0), 10.0);
        pid.update(2.0, 1.0, 100);
        assert_eq!(pid.update(3.0, 1.0, 100), 0.0);
    }

    #[test]
    fn test_integral_accumulates_and_clamps() {
        let mut pid = Pid::new(PidGains::new(0.0, 1.0, 0.0), 2.0);
        pid.update(2.0, 1.0, 0);
        assert!(approx(pid.update(2.0, 1.0, 1000), 1.0));
        assert!(approx(pid.update(2.0, 1.0, 2000), 2.0));
        // windup limited
        assert!(approx(pid.update(2.0, 1.0, 5000), 2.0));
        assert!(approx(pid.integral(), 2.0));

        pid.reset();
        assert_eq!(pid.integral(), 0.0);
    }

    #[test]
    fn test_regulator_clamps_and_skips_untargeted() {
        let config = RegulatorConfig {
            kp: 1000.0,
            target: PerAxis::new(Some(1.7), None),
            ..Default::default()
        };
        let mut reg = VelocityRegulator::new(&config);
        let limits = SpeedLimits::symmetric(480);

        assert_eq!(reg.command(Axis::Az, 1.0, 0, limits), Some(480));
        assert_eq!(reg.command(Axis::Alt, 1.0, 0, limits), None);

        reg.set_target(Axis::Alt, Some(1.0));
        assert_eq!(reg.command(Axis::Alt, 1.1, 0, limits), Some(-100));
    }
}
