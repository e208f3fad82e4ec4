//! Closed-loop velocity trim

pub mod pid;

pub use pid::{Pid, PidGains, VelocityRegulator};
