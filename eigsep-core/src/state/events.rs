//! Event taxonomy

use crate::axis::Axis;
use crate::sensor::Direction;

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Severity {
    Info,
    Warning,
}

/// Reportable conditions raised by the control logic
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    // Limit supervision
    /// Sensed direction disagrees with the commanded one
    LimitLatched {
        axis: Axis,
        commanded: Direction,
        sensed: Direction,
    },
    /// Mismatch resolved, forced reversal issued
    LimitRecovering { axis: Axis },
    /// Settle interval after recovery elapsed, flag cleared
    LimitCleared { axis: Axis },

    // Motor backend
    /// Axis velocity negated
    Reversed {
        axis: Axis,
        forced: bool,
        velocity: i32,
    },
    /// Non-forced reversal rejected by the debounce interval
    ReversalSkipped { axis: Axis, since_last_ms: u32 },
    /// Requested velocity outside the backend bounds
    SpeedClamped {
        axis: Axis,
        requested: i32,
        applied: i32,
    },
    /// Motor driver reported a fault
    DriverFault,

    // Soft limits and stalls
    /// Calibrated voltage end reached in the direction of travel
    SoftLimitReached { axis: Axis, volts: f32 },
    /// Axis commanded to move but no motion sensed
    StallDetected { axis: Axis, stationary_ms: u32 },
    /// Motion resumed on a stalled axis
    StallCleared { axis: Axis },

    // Sampling
    /// Consecutive sample reads timed out
    SampleTimeout { consecutive: u32 },
    /// Consecutive malformed sample frames
    SampleError { consecutive: u32 },
    /// Sampling recovered after failures
    SampleRecovered { failures: u32 },
}

impl Event {
    /// Severity of this event
    pub fn severity(&self) -> Severity {
        match self {
            Event::LimitLatched { .. }
            | Event::ReversalSkipped { .. }
            | Event::SpeedClamped { .. }
            | Event::DriverFault
            | Event::SoftLimitReached { .. }
            | Event::StallDetected { .. }
            | Event::SampleTimeout { .. }
            | Event::SampleError { .. } => Severity::Warning,
            Event::LimitRecovering { .. }
            | Event::LimitCleared { .. }
            | Event::Reversed { .. }
            | Event::StallCleared { .. }
            | Event::SampleRecovered { .. } => Severity::Info,
        }
    }

    /// Axis the event refers to, if any
    pub fn axis(&self) -> Option<Axis> {
        match *self {
            Event::LimitLatched { axis, .. }
            | Event::LimitRecovering { axis }
            | Event::LimitCleared { axis }
            | Event::Reversed { axis, .. }
            | Event::ReversalSkipped { axis, .. }
            | Event::SpeedClamped { axis, .. }
            | Event::SoftLimitReached { axis, .. }
            | Event::StallDetected { axis, .. }
            | Event::StallCleared { axis } => Some(axis),
            Event::DriverFault
            | Event::SampleTimeout { .. }
            | Event::SampleError { .. }
            | Event::SampleRecovered { .. } => None,
        }
    }
}

impl core::fmt::Display for Event {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {
            Event::LimitLatched {
                axis,
                commanded,
                sensed,
            } => write!(
                f,
                "{axis}: limit latched (commanded {commanded:?}, sensed {sensed:?})"
            ),
            Event::LimitRecovering { axis } => write!(f, "{axis}: forced reversal, settling"),
            Event::LimitCleared { axis } => write!(f, "{axis}: limit cleared"),
            Event::Reversed {
                axis,
                forced,
                velocity,
            } => {
                let kind = if forced { "forced reversal" } else { "reversal" };
                write!(f, "{axis}: {kind}, velocity now {velocity}")
            }
            Event::ReversalSkipped {
                axis,
                since_last_ms,
            } => write!(
                f,
                "{axis}: reversal skipped, last one {since_last_ms} ms ago"
            ),
            Event::SpeedClamped {
                axis,
                requested,
                applied,
            } => write!(f, "{axis}: velocity {requested} clamped to {applied}"),
            Event::DriverFault => f.write_str("motor driver fault"),
            Event::SoftLimitReached { axis, volts } => {
                write!(f, "{axis}: calibrated end reached at {volts:.3} V")
            }
            Event::StallDetected {
                axis,
                stationary_ms,
            } => write!(f, "{axis}: no motion for {stationary_ms} ms"),
            Event::StallCleared { axis } => write!(f, "{axis}: motion resumed"),
            Event::SampleTimeout { consecutive } => {
                write!(f, "{consecutive} consecutive sample timeouts")
            }
            Event::SampleError { consecutive } => {
                write!(f, "{consecutive} consecutive bad samples")
            }
            Event::SampleRecovered { failures } => {
                write!(f, "sampling recovered after {failures} failures")
            }
        }
    }
}

/// Destination for reportable events
pub trait EventSink {
    /// Report an event
    fn report(&mut self, event: Event);
}

/// Bounded in-memory sink; events past capacity are dropped
impl<const N: usize> EventSink for heapless::Vec<Event, N> {
    fn report(&mut self, event: Event) {
        let _ = self.push(event);
    }
}

/// Sink that discards everything
impl EventSink for () {
    fn report(&mut self, _event: Event) {}
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn report(&mut self, event: Event) {
        (**self).report(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity() {
        let latched = Event::LimitLatched {
            axis: Axis::Az,
            commanded: Direction::Forward,
            sensed: Direction::Reverse,
        };
        assert_eq!(latched.severity(), Severity::Warning);
        assert_eq!(Event::LimitCleared { axis: Axis::Az }.severity(), Severity::Info);
        assert_eq!(
            Event::SpeedClamped {
                axis: Axis::Alt,
                requested: 600,
                applied: 480
            }
            .severity(),
            Severity::Warning
        );
    }

    #[test]
    fn test_event_axis() {
        assert_eq!(Event::StallCleared { axis: Axis::Alt }.axis(), Some(Axis::Alt));
        assert_eq!(Event::SampleTimeout { consecutive: 3 }.axis(), None);
    }

    #[test]
    fn test_display() {
        use std::string::ToString;
        let event = Event::SpeedClamped {
            axis: Axis::Alt,
            requested: 600,
            applied: 480,
        };
        assert_eq!(event.to_string(), "alt: velocity 600 clamped to 480");
    }

    #[test]
    fn test_bounded_sink_drops_overflow() {
        let mut sink: heapless::Vec<Event, 2> = heapless::Vec::new();
        for _ in 0..3 {
            sink.report(Event::DriverFault);
        }
        assert_eq!(sink.len(), 2);
    }
}
