//! Motor boards on the Raspberry Pi peripherals

use core::fmt::Display;

use rppal::gpio::{Gpio, InputPin, OutputPin};
use rppal::hal::Delay;
use rppal::i2c::I2c;
use rppal::pwm::{Channel, Polarity, Pwm};

use eigsep_core::config::MotorConfig;
use eigsep_core::Axis;
use eigsep_drivers::motor::{HBridge, HBridgeChannel, Scmd};
use eigsep_drivers::Motor;

use crate::config::BoardConfig;
use crate::error::{ControllerError, ControllerResult};

pub type HBridgeMotor = Motor<HBridge<Pwm, OutputPin, OutputPin, InputPin>>;
pub type ScmdMotor = Motor<Scmd<I2c>>;

fn init_err(err: impl Display) -> ControllerError {
    ControllerError::DriverInit(err.to_string())
}

fn pwm_channel(index: u8) -> ControllerResult<Channel> {
    match index {
        0 => Ok(Channel::Pwm0),
        1 => Ok(Channel::Pwm1),
        _ => Err(ControllerError::DriverInit(format!(
            "no hardware PWM channel {}",
            index
        ))),
    }
}

/// Claim the H-bridge pins and enable the board
pub fn open_hbridge(board: &BoardConfig, motor: MotorConfig) -> ControllerResult<HBridgeMotor> {
    let gpio = Gpio::new().map_err(init_err)?;
    let pins = &board.hbridge;

    let channel = |axis: Axis| -> ControllerResult<HBridgeChannel<Pwm, OutputPin>> {
        let pwm = Pwm::with_frequency(
            pwm_channel(pins.pwm_channel[axis])?,
            pins.pwm_frequency_hz,
            0.0,
            Polarity::Normal,
            true,
        )
        .map_err(init_err)?;
        let dir = gpio.get(pins.dir_pin[axis]).map_err(init_err)?.into_output_low();
        Ok(HBridgeChannel::new(pwm, dir, board.invert[axis]))
    };
    let az = channel(Axis::Az)?;
    let alt = channel(Axis::Alt)?;

    // enable is active-low: start disabled
    let enable = gpio.get(pins.enable_pin).map_err(init_err)?.into_output_high();
    let fault = gpio.get(pins.fault_pin).map_err(init_err)?.into_input_pullup();

    let driver = HBridge::new(az, alt, enable, fault)
        .map_err(|err| ControllerError::DriverInit(format!("{:?}", err)))?;
    log::info!(
        "H-bridge ready (PWM {:?}, {} Hz)",
        pins.pwm_channel,
        pins.pwm_frequency_hz
    );
    Ok(Motor::new(driver, motor))
}

/// Open the I2C bus and bring up the SCMD board
pub fn open_scmd(board: &BoardConfig, motor: MotorConfig) -> ControllerResult<ScmdMotor> {
    let i2c = I2c::with_bus(board.scmd.bus).map_err(init_err)?;
    let driver = Scmd::new(i2c, board.scmd.address, board.invert, &mut Delay::new())
        .map_err(|err| ControllerError::DriverInit(format!("{:?}", err)))?;
    log::info!(
        "SCMD ready on i2c-{} at {:#04x}",
        board.scmd.bus,
        board.scmd.address
    );
    Ok(Motor::new(driver, motor))
}
