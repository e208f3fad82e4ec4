//! Controller configuration file
//!
//! Every section is optional; missing keys take the defaults of the
//! deployed mount. A missing file is not an error.

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use eigsep_core::config::{
    validate_timing, ConfigError, ControlConfig, EstimatorConfig, LatchPolicy, MotorConfig,
    RegulatorConfig, SamplerConfig, StallConfig, SupervisorConfig,
};
use eigsep_core::PerAxis;
use eigsep_drivers::motor::SCMD_DEFAULT_ADDRESS;
use eigsep_drivers::sim::{SimAxisConfig, SimMountConfig};
use eigsep_protocol::WireFormat;

use crate::error::{ControllerError, ControllerResult};

/// Motor driver board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BoardKind {
    /// Dual H-bridge on GPIO and hardware PWM
    #[default]
    #[serde(alias = "pololu")]
    #[value(alias = "pololu")]
    Hbridge,
    /// Serial controlled motor driver on I2C
    #[serde(alias = "qwiic")]
    #[value(alias = "qwiic")]
    Scmd,
    /// Simulated mount, no hardware
    Sim,
}

impl BoardKind {
    pub fn name(self) -> &'static str {
        match self {
            BoardKind::Hbridge => "hbridge",
            BoardKind::Scmd => "scmd",
            BoardKind::Sim => "sim",
        }
    }
}

/// Pin assignment of the H-bridge board
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HBridgeConfig {
    /// Hardware PWM channel per axis
    pub pwm_channel: PerAxis<u8>,
    /// Direction GPIO (BCM numbering) per axis
    pub dir_pin: PerAxis<u8>,
    /// Active-low enable GPIO
    pub enable_pin: u8,
    /// Active-low fault GPIO
    pub fault_pin: u8,
    pub pwm_frequency_hz: f64,
}

impl Default for HBridgeConfig {
    fn default() -> Self {
        Self {
            pwm_channel: PerAxis::new(0, 1),
            dir_pin: PerAxis::new(24, 25),
            enable_pin: 5,
            fault_pin: 6,
            pwm_frequency_hz: 20_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScmdConfig {
    pub bus: u8,
    pub address: u8,
}

impl Default for ScmdConfig {
    fn default() -> Self {
        Self {
            bus: 1,
            address: SCMD_DEFAULT_ADDRESS,
        }
    }
}

/// Simulated mount parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub start_volts: PerAxis<f32>,
    /// Limit switch positions per axis, `[low, high]`
    pub switch_range: PerAxis<[f32; 2]>,
    pub volts_per_unit_s: f32,
    pub noise_volts: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        let axis = SimAxisConfig::default();
        Self {
            start_volts: PerAxis::splat(axis.start_volts),
            switch_range: PerAxis::splat([axis.switch_range.0, axis.switch_range.1]),
            volts_per_unit_s: axis.volts_per_unit_s,
            noise_volts: SimMountConfig::default().noise_volts,
        }
    }
}

impl SimConfig {
    pub fn mount_config(&self) -> SimMountConfig {
        SimMountConfig {
            axes: PerAxis::from_fn(|axis| SimAxisConfig {
                start_volts: self.start_volts[axis],
                switch_range: (self.switch_range[axis][0], self.switch_range[axis][1]),
                volts_per_unit_s: self.volts_per_unit_s,
                ..SimAxisConfig::default()
            }),
            noise_volts: self.noise_volts,
            ..SimMountConfig::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub kind: BoardKind,
    /// Channels wired with reversed polarity
    pub invert: PerAxis<bool>,
    pub hbridge: HBridgeConfig,
    pub scmd: ScmdConfig,
    pub sim: SimConfig,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            kind: BoardKind::default(),
            // the alt motor is mounted mirrored
            invert: PerAxis::new(false, true),
            hbridge: HBridgeConfig::default(),
            scmd: ScmdConfig::default(),
            sim: SimConfig::default(),
        }
    }
}

/// Serial link to the pot ADC
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub format: WireFormat,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".into(),
            baud_rate: 115_200,
            format: WireFormat::Text,
        }
    }
}

/// Range calibration sweep settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Margin taken off each measured end (V)
    pub delta: f32,
    /// Where calibrated ranges are stored
    pub ranges_path: PathBuf,
    /// Upper bound on one sweep toward an end
    pub sweep_timeout_ms: u32,
    /// Sweep speed; the board maximum when unset
    pub velocity: Option<i32>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            delta: 0.1,
            ranges_path: PathBuf::from("ranges.toml"),
            sweep_timeout_ms: 120_000,
            velocity: None,
        }
    }
}

/// Complete controller configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub board: BoardConfig,
    pub serial: SerialConfig,
    pub estimator: EstimatorConfig,
    pub motor: MotorConfig,
    pub supervisor: SupervisorConfig,
    pub stall: StallConfig,
    pub regulator: RegulatorConfig,
    pub sampler: SamplerConfig,
    pub control: ControlConfig,
    pub calibration: CalibrationConfig,
}

impl AppConfig {
    /// Load from a TOML file, falling back to defaults when it is missing
    pub fn load(path: &Path) -> ControllerResult<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::info!("{} not found, using default configuration", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ControllerError::ConfigIo {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config = Self::parse(&text).map_err(|err| match err {
            ParseError::Toml(source) => ControllerError::ConfigParse {
                path: path.to_path_buf(),
                source,
            },
            ParseError::Invalid(err) => ControllerError::ConfigInvalid(err),
        })?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let config: Self = toml::from_str(text).map_err(ParseError::Toml)?;
        config.validate().map_err(ParseError::Invalid)?;
        Ok(config)
    }

    /// Check values serde cannot express constraints for
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_timing(&self.sampler, &self.control)?;
        if !self.estimator.zero_threshold.is_finite() || self.estimator.zero_threshold < 0.0 {
            return Err(ConfigError::InvalidValue("estimator.zero_threshold"));
        }
        if let LatchPolicy::MismatchNearRange { margin } = self.supervisor.policy {
            if !margin.is_finite() || margin < 0.0 {
                return Err(ConfigError::InvalidValue("supervisor.policy.margin"));
            }
        }
        if self.control.trim_deadband < 0 {
            return Err(ConfigError::InvalidValue("control.trim_deadband"));
        }
        if !self.calibration.delta.is_finite() || self.calibration.delta < 0.0 {
            return Err(ConfigError::InvalidValue("calibration.delta"));
        }
        if self.calibration.sweep_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue("calibration.sweep_timeout_ms"));
        }
        if matches!(self.calibration.velocity, Some(v) if v <= 0) {
            return Err(ConfigError::InvalidValue("calibration.velocity"));
        }
        if self.board.hbridge.pwm_frequency_hz <= 0.0 {
            return Err(ConfigError::InvalidValue("board.hbridge.pwm_frequency_hz"));
        }
        Ok(())
    }
}

/// Errors from [`AppConfig::parse`]
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid TOML: {0}")]
    Toml(#[source] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(#[source] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use eigsep_core::Axis;

    #[test]
    fn test_empty_file_is_default() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.motor.debounce_ms, 5000);
        assert!(config.board.invert[Axis::Alt]);
    }

    #[test]
    fn test_shipped_file_matches_defaults() {
        let config = AppConfig::parse(include_str!("../../eigsep.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = AppConfig::parse(
            r#"
            [board]
            kind = "qwiic"

            [motor]
            debounce_ms = 2000

            [supervisor.policy]
            kind = "mismatch_near_range"
            margin = 0.05

            [regulator]
            kp = 50.0
            target = { alt = 1.25 }

            [serial]
            format = "binary"
            "#,
        )
        .unwrap();
        assert_eq!(config.board.kind, BoardKind::Scmd);
        assert_eq!(config.motor.debounce_ms, 2000);
        assert_eq!(
            config.supervisor.policy,
            LatchPolicy::MismatchNearRange { margin: 0.05 }
        );
        assert_eq!(config.supervisor.settle_ms, 1000);
        assert_eq!(config.regulator.target[Axis::Alt], Some(1.25));
        assert_eq!(config.regulator.target[Axis::Az], None);
        assert!(config.regulator.is_active());
        assert_eq!(config.serial.format, WireFormat::Binary);
        assert_eq!(config.serial.baud_rate, 115_200);
    }

    #[test]
    fn test_zero_period_rejected() {
        let err = AppConfig::parse("[control]\nperiod_ms = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::Invalid(ConfigError::InvalidValue("control.period_ms"))
        ));
    }

    #[test]
    fn test_negative_margin_rejected() {
        let err = AppConfig::parse(
            "[supervisor.policy]\nkind = \"mismatch_near_range\"\nmargin = -0.1\n",
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::Invalid(_)));
    }

    #[test]
    fn test_parse_error_display() {
        let err = AppConfig::parse("[calibration]\ndelta = -0.5\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: invalid value for `calibration.delta`"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_unknown_board_is_parse_error() {
        let err = AppConfig::parse("[board]\nkind = \"stepper\"\n").unwrap_err();
        assert!(matches!(err, ParseError::Toml(_)));
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[motor\n").unwrap();
        match AppConfig::load(&path) {
            Err(ControllerError::ConfigParse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_sim_mount_config() {
        let mut sim = SimConfig::default();
        sim.start_volts[Axis::Alt] = 1.0;
        let mount = sim.mount_config();
        assert_eq!(mount.axes[Axis::Alt].start_volts, 1.0);
        assert_eq!(mount.axes[Axis::Az].switch_range, (0.6, 1.8));
    }
}
