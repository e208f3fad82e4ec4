//! Potentiometer sensing
//!
//! Converts raw ADC sums to voltages and classifies the recent voltage
//! trend of each axis into a [`Direction`].

pub mod direction;
pub mod history;
pub mod voltage;

pub use direction::{Direction, DirectionEstimator};
pub use history::{VoltageHistory, HISTORY_LEN};
pub use voltage::{RawPair, VoltageConverter, ADC_BITS, ADC_VREF};
