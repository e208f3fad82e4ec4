//! Inferred end-of-travel supervision
//!
//! The mount has no limit-switch input. An axis is presumed to be at its
//! mechanical limit when the pot moves against the commanded direction.

pub mod flag;
pub mod limit;

pub use flag::{LimitFlag, LimitFlags};
pub use limit::{AxisReading, LimitState, LimitSupervisor, SupervisorAction};
