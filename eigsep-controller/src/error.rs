//! Controller error types

use std::path::PathBuf;

use thiserror::Error;

use eigsep_core::config::ConfigError;
use eigsep_core::Axis;

/// Result alias for controller operations
pub type ControllerResult<T> = Result<T, ControllerError>;

/// Fatal controller errors
///
/// Conditions the control loops can ride through (sample timeouts, skipped
/// reversals, stalls) are reported as events, never as errors.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("cannot read {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    ConfigInvalid(#[from] ConfigError),

    #[error("cannot write {path}: {source}")]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialize ranges: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("cannot open serial port {port}: {source}")]
    Serial {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("cannot install the interrupt handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("motor board initialization failed: {0}")]
    DriverInit(String),

    #[error("motor error: {0}")]
    Motor(String),

    #[error("board `{0}` is not available in this build")]
    BoardUnavailable(&'static str),

    #[error("no axis selected")]
    NoAxisSelected,

    #[error("calibration of {axis} failed: {reason}")]
    Calibration { axis: Axis, reason: &'static str },
}

impl ControllerError {
    /// Wrap a motor backend error
    pub fn motor(err: impl core::fmt::Debug) -> Self {
        ControllerError::Motor(format!("{:?}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_config_error_is_source() {
        let err = ControllerError::from(ConfigError::InvalidValue("control.period_ms"));
        assert_eq!(
            err.to_string(),
            "invalid configuration: invalid value for `control.period_ms`"
        );
        let source = err.source().map(|s| s.to_string());
        assert_eq!(
            source.as_deref(),
            Some("invalid value for `control.period_ms`")
        );
    }

    #[test]
    fn test_core_errors_box_as_std_errors() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(eigsep_core::AxisError::InvalidAxis),
            Box::new(eigsep_core::traits::SampleError::Timeout),
            Box::new(ConfigError::EmptyRange(Axis::Alt)),
        ];
        assert_eq!(errors[1].to_string(), "sample read timed out");
        assert!(errors.iter().all(|e| e.source().is_none()));
    }
}
