//! Per-axis limit latch

use core::sync::atomic::{AtomicBool, Ordering};

use crate::axis::{Axis, PerAxis};

/// Boolean latch written by the supervisor, readable from anywhere
///
/// Only plain loads and stores are used so the type also works on
/// targets without compare-and-swap.
#[derive(Debug, Default)]
pub struct LimitFlag(AtomicBool);

impl LimitFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// One flag per axis
pub type LimitFlags = PerAxis<LimitFlag>;

impl LimitFlags {
    /// Both flags cleared
    pub const fn cleared() -> Self {
        PerAxis::new(LimitFlag::new(), LimitFlag::new())
    }

    /// Check if any axis is latched
    pub fn any_set(&self) -> bool {
        Axis::ALL.iter().any(|&axis| self[axis].is_set())
    }
}
