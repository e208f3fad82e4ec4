//! Simulated two-axis mount
//!
//! Each axis is a pot voltage moving at `volts_per_unit_s * velocity`.
//! Past either end of `switch_range` the axis runs into a limit switch:
//! the switch reverses the motor in hardware, so the pot moves opposite
//! to the command until it is back inside the range by `hysteresis`.
//! This is exactly the mismatch the limit supervisor watches for.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

use eigsep_core::{Axis, PerAxis};

/// Mount shared between the simulated driver and pot
pub type SharedMount<M> = Mutex<M, RefCell<SimMount>>;

/// Model parameters of one axis
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SimAxisConfig {
    /// Pot voltage at start
    pub start_volts: f32,
    /// Limit switch positions (low, high) in volts
    pub switch_range: (f32, f32),
    /// Distance back inside the range at which a switch releases
    pub hysteresis: f32,
    /// Slew rate per unit of commanded velocity (V/s)
    pub volts_per_unit_s: f32,
}

impl Default for SimAxisConfig {
    fn default() -> Self {
        Self {
            start_volts: 1.2,
            switch_range: (0.6, 1.8),
            hysteresis: 0.1,
            volts_per_unit_s: 0.001,
        }
    }
}

/// Model parameters of the mount
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SimMountConfig {
    pub axes: PerAxis<SimAxisConfig>,
    /// Peak pot noise (V), uniformly distributed
    pub noise_volts: f32,
    /// Full-scale voltage; the pot never leaves `0..=vref`
    pub vref: f32,
}

impl Default for SimMountConfig {
    fn default() -> Self {
        Self {
            axes: PerAxis::splat(SimAxisConfig::default()),
            noise_volts: 0.0005,
            vref: eigsep_core::sensor::ADC_VREF,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct AxisModel {
    volts: f32,
    velocity: i32,
    switch_engaged: bool,
}

/// Simulated mount plant
#[derive(Debug, Clone)]
pub struct SimMount {
    config: SimMountConfig,
    axes: PerAxis<AxisModel>,
    last_ms: Option<u32>,
    /// xorshift state for pot noise
    noise_state: u32,
}

impl SimMount {
    pub fn new(config: SimMountConfig) -> Self {
        Self {
            axes: config.axes.map(|_, axis| AxisModel {
                volts: axis.start_volts,
                velocity: 0,
                switch_engaged: false,
            }),
            config,
            last_ms: None,
            noise_state: 0x2545_F491,
        }
    }

    /// Wrap in a mutex for sharing
    pub fn shared<M: RawMutex>(self) -> SharedMount<M> {
        Mutex::new(RefCell::new(self))
    }

    pub fn config(&self) -> &SimMountConfig {
        &self.config
    }

    /// Set the commanded velocity of an axis
    pub fn set_velocity(&mut self, axis: Axis, velocity: i32) {
        self.axes[axis].velocity = velocity;
    }

    /// Commanded velocity of an axis
    pub fn velocity(&self, axis: Axis) -> i32 {
        self.axes[axis].velocity
    }

    /// True pot voltage of an axis (no noise)
    pub fn volts(&self, axis: Axis) -> f32 {
        self.axes[axis].volts
    }

    /// Check if the axis is held by a limit switch
    pub fn switch_engaged(&self, axis: Axis) -> bool {
        self.axes[axis].switch_engaged
    }

    /// Integrate motion up to `now_ms`
    pub fn advance(&mut self, now_ms: u32) {
        let dt_s = match self.last_ms {
            Some(last) => now_ms.wrapping_sub(last) as f32 / 1000.0,
            None => 0.0,
        };
        self.last_ms = Some(now_ms);

        for axis in Axis::ALL {
            self.step_axis(axis, dt_s);
        }
    }

    fn step_axis(&mut self, axis: Axis, dt_s: f32) {
        let params = self.config.axes[axis];
        let vref = self.config.vref;
        let model = &mut self.axes[axis];
        let (low, high) = params.switch_range;

        let rate = model.velocity as f32 * params.volts_per_unit_s;
        let rate = if model.switch_engaged { -rate } else { rate };
        model.volts = (model.volts + rate * dt_s).clamp(0.0, vref);

        if model.switch_engaged {
            let inside = model.volts <= high - params.hysteresis
                && model.volts >= low + params.hysteresis;
            if inside {
                model.switch_engaged = false;
            }
        } else if model.volts >= high || model.volts <= low {
            model.switch_engaged = true;
        }
    }

    /// Pot voltages with noise
    pub fn read(&mut self) -> PerAxis<f32> {
        let vref = self.config.vref;
        let mut out = PerAxis::splat(0.0f32);
        for axis in Axis::ALL {
            let noise = self.noise();
            out[axis] = (self.axes[axis].volts + noise).clamp(0.0, vref);
        }
        out
    }

    /// Uniform noise in `[-noise_volts, noise_volts]`
    fn noise(&mut self) -> f32 {
        let mut x = self.noise_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.noise_state = x;
        let unit = (x >> 8) as f32 / (1u32 << 24) as f32;
        (unit * 2.0 - 1.0) * self.config.noise_volts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> SimMount {
        SimMount::new(SimMountConfig {
            noise_volts: 0.0,
            ..Default::default()
        })
    }

    #[test]
    fn test_integrates_velocity() {
        let mut mount = quiet();
        mount.set_velocity(Axis::Az, 200);
        mount.advance(0);
        mount.advance(1000);

        assert!((mount.volts(Axis::Az) - 1.4).abs() < 1e-4);
        assert!((mount.volts(Axis::Alt) - 1.2).abs() < 1e-6);
    }

    #[test]
    fn test_limit_switch_reverses_motion() {
        let mut mount = quiet();
        mount.set_velocity(Axis::Alt, 200);
        mount.advance(0);

        // 1.2 V -> 1.8 V takes 3 s at 0.2 V/s
        let mut t = 0;
        while !mount.switch_engaged(Axis::Alt) {
            t += 100;
            mount.advance(t);
            assert!(t < 5000);
        }
        let at_switch = mount.volts(Axis::Alt);

        // still commanded forward, moving backward
        t += 100;
        mount.advance(t);
        assert!(mount.volts(Axis::Alt) < at_switch);

        // released once back inside by the hysteresis
        while mount.switch_engaged(Axis::Alt) {
            t += 100;
            mount.advance(t);
            assert!(t < 10_000);
        }
        assert!(mount.volts(Axis::Alt) <= 1.8 - 0.1);
    }

    #[test]
    fn test_noise_is_bounded() {
        let mut mount = SimMount::new(SimMountConfig {
            noise_volts: 0.01,
            ..Default::default()
        });
        for _ in 0..1000 {
            let v = mount.read();
            assert!((v.az - 1.2).abs() <= 0.01 + 1e-6);
        }
    }
}
