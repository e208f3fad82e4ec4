//! Sample stream health
//!
//! Read failures are transient and retried. Consecutive failures are
//! counted and surfaced every `report_threshold` failures; the first good
//! sample after a reported run is surfaced too.

use crate::state::{Event, EventSink};
use crate::traits::SampleError;

/// Consecutive sample failure counter
#[derive(Debug, Clone)]
pub struct SampleHealth {
    report_threshold: u32,
    consecutive: u32,
    reported: bool,
    total_failures: u32,
}

impl SampleHealth {
    /// `report_threshold` of zero is treated as one
    pub fn new(report_threshold: u32) -> Self {
        Self {
            report_threshold: report_threshold.max(1),
            consecutive: 0,
            reported: false,
            total_failures: 0,
        }
    }

    /// Current run of consecutive failures
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive
    }

    /// Failures since start-up
    pub fn total_failures(&self) -> u32 {
        self.total_failures
    }

    /// Record a failed read
    pub fn on_error(&mut self, error: SampleError, sink: &mut dyn EventSink) {
        self.consecutive = self.consecutive.saturating_add(1);
        self.total_failures = self.total_failures.saturating_add(1);

        if self.consecutive % self.report_threshold == 0 {
            self.reported = true;
            let consecutive = self.consecutive;
            sink.report(match error {
                SampleError::Timeout => Event::SampleTimeout { consecutive },
                SampleError::Malformed | SampleError::Io => Event::SampleError { consecutive },
            });
        }
    }

    /// Record a good read
    pub fn on_success(&mut self, sink: &mut dyn EventSink) {
        if self.reported {
            sink.report(Event::SampleRecovered {
                failures: self.consecutive,
            });
        }
        self.consecutive = 0;
        self.reported = false;
    }
}
