//! Motor backends for the two-axis mount
//!
//! This crate provides concrete implementations of the traits defined
//! in eigsep-core:
//!
//! - [`Motor`]: the motor backend (clamping, debounced reversal)
//! - Driver boards: discrete H-bridge (GPIO + PWM) and SCMD (I2C)
//! - A simulated mount with hardware limit switches, plus a simulated
//!   driver and potentiometer source for running without hardware

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod motor;
pub mod sim;

pub use motor::{Motor, MotorError};
