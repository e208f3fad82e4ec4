//! Safety monitoring
//!
//! Last-resort checks layered on top of the limit supervisor: calibrated
//! soft limits, stalled axes and sample stream health.

pub mod health;
pub mod soft_limit;
pub mod stall;

pub use health::SampleHealth;
pub use soft_limit::soft_limit_reached;
pub use stall::StallMonitor;
