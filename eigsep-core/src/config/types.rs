//! Configuration type definitions
//!
//! Timing values are in milliseconds, voltages in volts. Every struct
//! implements `Default` with values that work on the deployed mount.

use crate::axis::PerAxis;

use super::range::ConfigError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Direction estimator settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EstimatorConfig {
    /// Dead zone on the mean per-sample voltage change (V)
    pub zero_threshold: f32,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            zero_threshold: 0.0015,
        }
    }
}

/// Motor backend settings shared by every board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MotorConfig {
    /// Minimum time between two non-forced reversals of the same axis
    pub debounce_ms: u32,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self { debounce_ms: 5000 }
    }
}

/// When a direction mismatch is accepted as a limit condition
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum LatchPolicy {
    /// Direction mismatch alone
    #[default]
    Mismatch,
    /// Mismatch while the voltage is within `margin` of a calibrated end
    MismatchNearRange { margin: f32 },
}

/// Limit supervisor settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SupervisorConfig {
    /// Time given to a forced reversal before the axis is re-evaluated
    pub settle_ms: u32,
    /// Latch policy
    pub policy: LatchPolicy,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            settle_ms: 1000,
            policy: LatchPolicy::Mismatch,
        }
    }
}

/// Stall (no motion while commanded) escalation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StallConfig {
    /// How long a commanded axis may report no motion
    pub timeout_ms: u32,
    /// Force-reverse both driving axes when a stall is detected
    pub reverse_on_stall: bool,
}

impl Default for StallConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            reverse_on_stall: false,
        }
    }
}

/// Velocity regulator (PID trim) settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RegulatorConfig {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Anti-windup bound on the integral accumulator (V·s)
    pub integral_limit: f32,
    /// Target voltage per axis; `None` leaves the axis untrimmed
    pub target: PerAxis<Option<f32>>,
}

impl Default for RegulatorConfig {
    fn default() -> Self {
        Self {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            integral_limit: 10.0,
            target: PerAxis::splat(None),
        }
    }
}

impl RegulatorConfig {
    /// Check if any gain is non-zero
    pub fn is_configured(&self) -> bool {
        self.kp != 0.0 || self.ki != 0.0 || self.kd != 0.0
    }

    /// Check if the regulator should run at all
    pub fn is_active(&self) -> bool {
        self.is_configured() && (self.target.az.is_some() || self.target.alt.is_some())
    }
}

/// Sampling activity settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SamplerConfig {
    /// Nominal sample period
    pub period_ms: u32,
    /// Read timeout on the sample source
    pub read_timeout_ms: u32,
    /// Readings summed into each raw sample by the remote ADC
    pub sum_count: u32,
    /// Consecutive failed reads before the condition is reported
    pub error_report_threshold: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            period_ms: 50,
            read_timeout_ms: 1000,
            sum_count: 10,
            error_report_threshold: 5,
        }
    }
}

/// Control loop settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControlConfig {
    /// Control tick period
    pub period_ms: u32,
    /// Smallest velocity change the regulator is allowed to issue
    pub trim_deadband: i32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            period_ms: 100,
            trim_deadband: 5,
        }
    }
}

/// Validate timing values that must be non-zero
pub fn validate_timing(sampler: &SamplerConfig, control: &ControlConfig) -> Result<(), ConfigError> {
    if sampler.period_ms == 0 {
        return Err(ConfigError::InvalidValue("sampler.period_ms"));
    }
    if sampler.read_timeout_ms == 0 {
        return Err(ConfigError::InvalidValue("sampler.read_timeout_ms"));
    }
    if sampler.sum_count == 0 {
        return Err(ConfigError::InvalidValue("sampler.sum_count"));
    }
    if control.period_ms == 0 {
        return Err(ConfigError::InvalidValue("control.period_ms"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(EstimatorConfig::default().zero_threshold, 0.0015);
        assert_eq!(MotorConfig::default().debounce_ms, 5000);
        assert_eq!(SupervisorConfig::default().policy, LatchPolicy::Mismatch);
        assert!(!RegulatorConfig::default().is_active());
        assert!(validate_timing(&SamplerConfig::default(), &ControlConfig::default()).is_ok());
    }

    #[test]
    fn test_regulator_needs_gain_and_target() {
        let mut config = RegulatorConfig {
            kp: 100.0,
            ..Default::default()
        };
        assert!(config.is_configured());
        assert!(!config.is_active());

        config.target.alt = Some(1.2);
        assert!(config.is_active());
    }

    #[test]
    fn test_zero_period_rejected() {
        let sampler = SamplerConfig {
            period_ms: 0,
            ..Default::default()
        };
        assert_eq!(
            validate_timing(&sampler, &ControlConfig::default()),
            Err(ConfigError::InvalidValue("sampler.period_ms"))
        );
    }
}
