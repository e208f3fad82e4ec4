//! Board-agnostic core logic for the two-axis mount controller
//!
//! This crate contains all control logic that does not depend on
//! specific hardware implementations:
//!
//! - Axis identifiers and per-axis storage
//! - Voltage conversion and the potentiometer direction estimator
//! - Limit supervision (inferred end-of-travel detection and recovery)
//! - Stall monitoring
//! - Closed-loop velocity trim
//! - Reportable events
//! - Hardware abstraction traits (motor driver, sample source, range store)
//! - Configuration type definitions

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod axis;
pub mod config;
pub mod control;
pub mod safety;
pub mod sensor;
pub mod state;
pub mod supervisor;
pub mod traits;

pub use axis::{Axis, AxisError, AxisSet, PerAxis};
