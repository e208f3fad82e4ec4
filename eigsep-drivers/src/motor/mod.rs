//! Motor backend and driver boards
//!
//! - [`Motor`]: generic backend over any [`MotorDriver`](eigsep_core::traits::MotorDriver)
//! - [`HBridge`]: dual H-bridge with per-axis PWM + direction pins,
//!   shared active-low enable and fault lines
//! - [`Scmd`]: serial controlled motor driver board on I2C

pub mod backend;
pub mod hbridge;
pub mod scmd;

pub use backend::{Motor, MotorError};
pub use hbridge::{HBridge, HBridgeChannel, HBridgeError, HBRIDGE_LIMITS};
pub use scmd::{Scmd, ScmdError, SCMD_DEFAULT_ADDRESS, SCMD_LIMITS};
