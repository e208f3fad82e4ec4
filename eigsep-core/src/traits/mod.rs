//! Seams between the control logic and the outside world
//!
//! Motor boards, the sample stream and range persistence are all reached
//! through these traits.

pub mod motor;
pub mod sample;
pub mod store;

pub use motor::{MotorBackend, MotorDriver, ReverseOutcome, SpeedLimits};
pub use sample::{SampleError, SampleSource};
pub use store::RangeStore;
