//! Host controller for the two-axis mount
//!
//! Runs the sampler and controller activities on an embassy executor:
//!
//! ```text
//!   serial thread ──► SampleChannel ──► sampler ──► SharedState ──► controller ──► MotorBackend
//!   (or SimPot)                          (estimator, volts,         (supervisor, stall,
//!                                         soft-limit requests)       soft limits, trim)
//! ```
//!
//! The binary also provides pot readout and range calibration commands.

pub mod app;
pub mod calibrate;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
#[cfg(feature = "rpi")]
pub mod hardware;
pub mod logging;
pub mod sampler;
pub mod shared;
pub mod store;
pub mod transport;

pub use config::AppConfig;
pub use error::{ControllerError, ControllerResult};
