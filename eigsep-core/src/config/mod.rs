//! Settings and calibrated ranges
//!
//! Plain data with defaults; the `serde` feature lets the controller read
//! them from its TOML file.

pub mod range;
pub mod types;

pub use range::*;
pub use types::*;
