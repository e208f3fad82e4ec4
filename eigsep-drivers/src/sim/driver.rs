//! Simulated motor driver

use embassy_sync::blocking_mutex::raw::RawMutex;

use eigsep_core::traits::{MotorDriver, SpeedLimits};
use eigsep_core::Axis;

use super::mount::SharedMount;

/// Velocity bounds of the simulated board
pub const SIM_LIMITS: SpeedLimits = SpeedLimits::symmetric(250);

/// Driver writing velocities into a simulated mount
pub struct SimDriver<'a, M: RawMutex> {
    mount: &'a SharedMount<M>,
    shut_down: bool,
}

impl<'a, M: RawMutex> SimDriver<'a, M> {
    pub fn new(mount: &'a SharedMount<M>) -> Self {
        Self {
            mount,
            shut_down: false,
        }
    }

    /// Check if the driver was shut down
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

impl<M: RawMutex> MotorDriver for SimDriver<'_, M> {
    type Error = core::convert::Infallible;

    fn speed_limits(&self) -> SpeedLimits {
        SIM_LIMITS
    }

    fn drive(&mut self, axis: Axis, velocity: i32) -> Result<(), Self::Error> {
        self.mount
            .lock(|mount| mount.borrow_mut().set_velocity(axis, velocity));
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), Self::Error> {
        self.mount.lock(|mount| {
            let mut mount = mount.borrow_mut();
            for axis in Axis::ALL {
                mount.set_velocity(axis, 0);
            }
        });
        self.shut_down = true;
        Ok(())
    }
}
