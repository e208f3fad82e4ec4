//! Raw ADC to voltage conversion
//!
//! The remote sampler reads each potentiometer with a 16-bit ADC
//! referenced to 3.3 V and reports the *sum* of a fixed number of
//! consecutive readings, so the converter first averages and then scales.

use crate::axis::{Axis, PerAxis};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// ADC resolution in bits
pub const ADC_BITS: u8 = 16;

/// ADC full-scale reference voltage
pub const ADC_VREF: f32 = 3.3;

/// One raw sample pair as delivered by the sample source, in wire order
/// (az, alt)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawPair {
    pub az: i64,
    pub alt: i64,
}

impl RawPair {
    pub const fn new(az: i64, alt: i64) -> Self {
        Self { az, alt }
    }

    /// Raw value for one axis
    pub const fn get(&self, axis: Axis) -> i64 {
        match axis {
            Axis::Az => self.az,
            Axis::Alt => self.alt,
        }
    }
}

/// Stateless raw-to-volts converter
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VoltageConverter {
    /// ADC resolution in bits
    pub bits: u8,
    /// Voltage at full-scale code
    pub vref: f32,
    /// Number of readings summed into each raw sample (1 = already averaged)
    pub sum_count: u32,
}

impl Default for VoltageConverter {
    fn default() -> Self {
        Self {
            bits: ADC_BITS,
            vref: ADC_VREF,
            sum_count: 1,
        }
    }
}

impl VoltageConverter {
    /// Converter for sums of `sum_count` readings
    pub const fn summing(sum_count: u32) -> Self {
        Self {
            bits: ADC_BITS,
            vref: ADC_VREF,
            sum_count,
        }
    }

    /// Largest ADC code
    pub const fn max_code(&self) -> u32 {
        (1u32 << self.bits) - 1
    }

    /// Volts per ADC code
    pub fn step(&self) -> f32 {
        self.vref / self.max_code() as f32
    }

    /// Convert one (averaged) ADC code to volts
    pub fn bit2volt(&self, code: f32) -> f32 {
        self.step() * code
    }

    /// Quantize a voltage to the nearest ADC code, saturating at the rails
    pub fn volt2bit(&self, volts: f32) -> u32 {
        if volts <= 0.0 {
            return 0;
        }
        let code = volts / self.step() + 0.5;
        if code >= self.max_code() as f32 {
            self.max_code()
        } else {
            code as u32
        }
    }

    /// Convert a raw summed sample to volts
    pub fn sum_to_volts(&self, sum: i64) -> f32 {
        let count = self.sum_count.max(1);
        self.bit2volt(sum as f32 / count as f32)
    }

    /// Convert a raw pair to per-axis volts
    pub fn convert(&self, raw: RawPair) -> PerAxis<f32> {
        PerAxis::from_fn(|axis| self.sum_to_volts(raw.get(axis)))
    }
}
