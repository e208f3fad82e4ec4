//! Reportable events
//!
//! Every state transition of the control logic is surfaced as an
//! [`Event`] pushed into an [`EventSink`]. The sink decides where events
//! go (log stream, test buffer, channel).

pub mod events;

pub use events::{Event, EventSink, Severity};
