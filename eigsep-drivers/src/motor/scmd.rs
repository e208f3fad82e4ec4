//! Serial controlled motor driver (SCMD) on I2C
//!
//! The board exposes one drive register per motor channel holding an
//! unsigned level: `128 + n` drives forward, `127 - n` drives backward,
//! 127/128 is stop. Forward on the board is the voltage-increasing
//! direction unless the channel is marked inverted.
//!
//! Construction waits for the board to finish enumeration and checks its
//! ID register; a board that does not answer is a fatal start-up error.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use eigsep_core::traits::{MotorDriver, SpeedLimits};
use eigsep_core::{Axis, PerAxis};

/// Factory I2C address
pub const SCMD_DEFAULT_ADDRESS: u8 = 0x5D;

/// Velocity bounds of the board
pub const SCMD_LIMITS: SpeedLimits = SpeedLimits::new(-255, 254);

const REG_ID: u8 = 0x01;
const ID_WORD: u8 = 0xA9;
const REG_STATUS_1: u8 = 0x77;
const STATUS_ENUMERATED: u8 = 0x01;
const REG_MA_DRIVE: u8 = 0x20;
const REG_DRIVER_ENABLE: u8 = 0x70;

/// Enumeration poll attempts and interval
const READY_ATTEMPTS: u32 = 50;
const READY_POLL_MS: u32 = 20;

/// Errors from the SCMD board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScmdError<E> {
    /// Bus error
    I2c(E),
    /// Board did not acknowledge start-up (wrong ID or never enumerated)
    InitFailed,
}

/// SCMD driver board
pub struct Scmd<I> {
    i2c: I,
    address: u8,
    /// Board channel and polarity per axis
    channels: PerAxis<(u8, bool)>,
}

impl<I: I2c> Scmd<I> {
    /// Initialize the board and enable its outputs
    ///
    /// `inverted` marks channels wired with opposite polarity. The az
    /// motor is on channel A, alt on channel B.
    pub fn new(
        i2c: I,
        address: u8,
        inverted: PerAxis<bool>,
        delay: &mut impl DelayNs,
    ) -> Result<Self, ScmdError<I::Error>> {
        let mut board = Self {
            i2c,
            address,
            channels: PerAxis::new((0, inverted.az), (1, inverted.alt)),
        };

        board.wait_ready(delay)?;
        if board.read(REG_ID)? != ID_WORD {
            return Err(ScmdError::InitFailed);
        }

        for axis in Axis::ALL {
            board.write_drive(axis, 0)?;
        }
        board.set_enabled(true)?;
        Ok(board)
    }

    /// Enable or disable all outputs
    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), ScmdError<I::Error>> {
        self.write(REG_DRIVER_ENABLE, enabled as u8)
    }

    /// Release the bus
    pub fn release(self) -> I {
        self.i2c
    }

    fn wait_ready(&mut self, delay: &mut impl DelayNs) -> Result<(), ScmdError<I::Error>> {
        for _ in 0..READY_ATTEMPTS {
            // the board NAKs while booting
            if let Ok(status) = self.read(REG_STATUS_1) {
                if status & STATUS_ENUMERATED != 0 {
                    return Ok(());
                }
            }
            delay.delay_ms(READY_POLL_MS);
        }
        Err(ScmdError::InitFailed)
    }

    fn write_drive(&mut self, axis: Axis, velocity: i32) -> Result<(), ScmdError<I::Error>> {
        let (channel, inverted) = self.channels[axis];
        let velocity = if inverted { -velocity } else { velocity };
        self.write(REG_MA_DRIVE + channel, drive_level(velocity))
    }

    fn read(&mut self, reg: u8) -> Result<u8, ScmdError<I::Error>> {
        let mut buf = [0u8];
        self.i2c
            .write_read(self.address, &[reg], &mut buf)
            .map_err(ScmdError::I2c)?;
        Ok(buf[0])
    }

    fn write(&mut self, reg: u8, value: u8) -> Result<(), ScmdError<I::Error>> {
        self.i2c
            .write(self.address, &[reg, value])
            .map_err(ScmdError::I2c)
    }
}

/// Drive register value for a signed velocity
fn drive_level(velocity: i32) -> u8 {
    let speed = velocity.unsigned_abs().min(255);
    if velocity > 0 {
        (128 + speed / 2).min(255) as u8
    } else {
        127u32.saturating_sub((speed + 1) / 2) as u8
    }
}

impl<I: I2c> MotorDriver for Scmd<I> {
    type Error = ScmdError<I::Error>;

    fn speed_limits(&self) -> SpeedLimits {
        SCMD_LIMITS
    }

    fn drive(&mut self, axis: Axis, velocity: i32) -> Result<(), Self::Error> {
        self.write_drive(axis, velocity)
    }

    fn shutdown(&mut self) -> Result<(), Self::Error> {
        for axis in Axis::ALL {
            self.write_drive(axis, 0)?;
        }
        self.set_enabled(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};
    use std::vec::Vec;

    /// Register-file model of the board
    struct MockBus {
        regs: [u8; 256],
        writes: Vec<(u8, u8)>,
    }

    impl MockBus {
        fn ready() -> Self {
            let mut regs = [0u8; 256];
            regs[REG_ID as usize] = ID_WORD;
            regs[REG_STATUS_1 as usize] = STATUS_ENUMERATED;
            Self {
                regs,
                writes: Vec::new(),
            }
        }
    }

    impl ErrorType for MockBus {
        type Error = ErrorKind;
    }

    impl I2c for MockBus {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), ErrorKind> {
            assert_eq!(address, SCMD_DEFAULT_ADDRESS);
            let mut reg = 0u8;
            for op in operations {
                match op {
                    Operation::Write(bytes) => {
                        reg = bytes[0];
                        if let Some(&value) = bytes.get(1) {
                            self.regs[reg as usize] = value;
                            self.writes.push((reg, value));
                        }
                    }
                    Operation::Read(buf) => {
                        buf[0] = self.regs[reg as usize];
                    }
                }
            }
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    fn board(bus: MockBus, inverted: PerAxis<bool>) -> Result<Scmd<MockBus>, ScmdError<ErrorKind>> {
        Scmd::new(bus, SCMD_DEFAULT_ADDRESS, inverted, &mut NoDelay)
    }

    #[test]
    fn test_drive_levels() {
        assert_eq!(drive_level(0), 127);
        assert_eq!(drive_level(254), 255);
        assert_eq!(drive_level(2), 129);
        assert_eq!(drive_level(-255), 0);
        assert_eq!(drive_level(-2), 126);
    }

    #[test]
    fn test_init_enables_board() {
        let scmd = board(MockBus::ready(), PerAxis::splat(false)).unwrap();
        let bus = scmd.release();
        assert_eq!(bus.regs[REG_DRIVER_ENABLE as usize], 1);
        assert_eq!(bus.regs[REG_MA_DRIVE as usize], 127);
        assert_eq!(bus.regs[REG_MA_DRIVE as usize + 1], 127);
    }

    #[test]
    fn test_wrong_id_fails() {
        let mut bus = MockBus::ready();
        bus.regs[REG_ID as usize] = 0x00;
        assert!(matches!(
            board(bus, PerAxis::splat(false)),
            Err(ScmdError::InitFailed)
        ));
    }

    #[test]
    fn test_never_enumerated_fails() {
        let mut bus = MockBus::ready();
        bus.regs[REG_STATUS_1 as usize] = 0;
        assert!(matches!(
            board(bus, PerAxis::splat(false)),
            Err(ScmdError::InitFailed)
        ));
    }

    #[test]
    fn test_channel_polarity() {
        let mut scmd = board(MockBus::ready(), PerAxis::new(false, true)).unwrap();
        scmd.drive(Axis::Az, 200).unwrap();
        scmd.drive(Axis::Alt, 200).unwrap();

        let bus = scmd.release();
        assert_eq!(bus.regs[REG_MA_DRIVE as usize], 228);
        assert_eq!(bus.regs[REG_MA_DRIVE as usize + 1], 27);
    }

    #[test]
    fn test_shutdown() {
        let mut scmd = board(MockBus::ready(), PerAxis::splat(false)).unwrap();
        scmd.drive(Axis::Az, -100).unwrap();
        scmd.shutdown().unwrap();

        let bus = scmd.release();
        assert_eq!(bus.regs[REG_MA_DRIVE as usize], 127);
        assert_eq!(bus.regs[REG_DRIVER_ENABLE as usize], 0);
        assert_eq!(bus.writes.last(), Some(&(REG_DRIVER_ENABLE, 0)));
    }
}
