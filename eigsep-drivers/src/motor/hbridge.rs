//! Dual H-bridge driver board
//!
//! Each axis has a PWM speed input and a direction pin. The board has one
//! enable line (active-low) and one fault line (pulled high, driven low on
//! fault) shared by both channels.
//!
//! Direction pin convention: low drives the voltage-increasing direction.
//! A channel wired with opposite polarity is marked `inverted`.

use embedded_hal::digital::{self, InputPin, OutputPin, PinState};
use embedded_hal::pwm::{self, SetDutyCycle};

use eigsep_core::traits::{MotorDriver, SpeedLimits};
use eigsep_core::{Axis, PerAxis};

/// Velocity bounds of the board
pub const HBRIDGE_LIMITS: SpeedLimits = SpeedLimits::symmetric(480);

/// Errors from the H-bridge pins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HBridgeError {
    /// Digital pin access failed
    Pin(digital::ErrorKind),
    /// PWM channel access failed
    Pwm(pwm::ErrorKind),
}

fn pin_err<E: digital::Error>(err: E) -> HBridgeError {
    HBridgeError::Pin(err.kind())
}

fn pwm_err<E: pwm::Error>(err: E) -> HBridgeError {
    HBridgeError::Pwm(err.kind())
}

/// One motor channel: speed PWM and direction pin
pub struct HBridgeChannel<P, D> {
    pwm: P,
    dir: D,
    inverted: bool,
}

impl<P: SetDutyCycle, D: OutputPin> HBridgeChannel<P, D> {
    pub fn new(pwm: P, dir: D, inverted: bool) -> Self {
        Self { pwm, dir, inverted }
    }

    fn drive(&mut self, velocity: i32, max: i32) -> Result<(), HBridgeError> {
        let velocity = if self.inverted { -velocity } else { velocity };

        let state = if velocity > 0 {
            PinState::Low
        } else {
            PinState::High
        };
        self.dir.set_state(state).map_err(pin_err)?;

        let speed = velocity.unsigned_abs().min(max.unsigned_abs());
        let max = max.unsigned_abs().max(1);
        // duty = speed / max of the PWM range
        let duty = (speed as u64 * self.pwm.max_duty_cycle() as u64 / max as u64) as u16;
        self.pwm.set_duty_cycle(duty).map_err(pwm_err)
    }

    fn release(&mut self) -> Result<(), HBridgeError> {
        self.pwm.set_duty_cycle_fully_off().map_err(pwm_err)
    }
}

/// Dual H-bridge board
pub struct HBridge<P, D, EN, FLT> {
    channels: PerAxis<HBridgeChannel<P, D>>,
    enable: EN,
    fault: FLT,
}

impl<P, D, EN, FLT> HBridge<P, D, EN, FLT>
where
    P: SetDutyCycle,
    D: OutputPin,
    EN: OutputPin,
    FLT: InputPin,
{
    /// Take ownership of the pins, zero both channels and enable the board
    pub fn new(
        az: HBridgeChannel<P, D>,
        alt: HBridgeChannel<P, D>,
        enable: EN,
        fault: FLT,
    ) -> Result<Self, HBridgeError> {
        let mut board = Self {
            channels: PerAxis::new(az, alt),
            enable,
            fault,
        };
        for axis in Axis::ALL {
            board.channels[axis].release()?;
        }
        board.set_enabled(true)?;
        Ok(board)
    }

    /// Drive the enable line (active-low)
    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), HBridgeError> {
        if enabled {
            self.enable.set_low().map_err(pin_err)
        } else {
            self.enable.set_high().map_err(pin_err)
        }
    }
}

impl<P, D, EN, FLT> MotorDriver for HBridge<P, D, EN, FLT>
where
    P: SetDutyCycle,
    D: OutputPin,
    EN: OutputPin,
    FLT: InputPin,
{
    type Error = HBridgeError;

    fn speed_limits(&self) -> SpeedLimits {
        HBRIDGE_LIMITS
    }

    fn drive(&mut self, axis: Axis, velocity: i32) -> Result<(), Self::Error> {
        self.channels[axis].drive(velocity, HBRIDGE_LIMITS.max)
    }

    fn fault(&mut self) -> Result<bool, Self::Error> {
        self.fault.is_low().map_err(pin_err)
    }

    fn shutdown(&mut self) -> Result<(), Self::Error> {
        for axis in Axis::ALL {
            self.channels[axis].release()?;
        }
        self.set_enabled(false)
    }
}
