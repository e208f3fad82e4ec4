//! Hardware-free mount simulation
//!
//! [`SimMount`] integrates commanded velocities into pot voltages and
//! models the hardware limit switches at both ends of travel. The
//! simulated driver and pot source share one mount through a
//! [`SharedMount`] so the control loop closes through the model the same
//! way it closes through the real mount.

pub mod driver;
pub mod mount;
pub mod pot;

pub use driver::{SimDriver, SIM_LIMITS};
pub use mount::{SharedMount, SimAxisConfig, SimMount, SimMountConfig};
pub use pot::SimPot;
