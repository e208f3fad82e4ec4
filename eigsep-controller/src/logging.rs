//! Log setup and the event sink that writes to it

use env_logger::Builder;
use log::LevelFilter;

use eigsep_core::state::{Event, EventSink, Severity};

/// Logger configuration: `info` (or `debug` with `verbose`), unless
/// `rust_log` names its own filters
fn builder(verbose: bool, rust_log: Option<&str>) -> Builder {
    let mut builder = Builder::new();
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    } else {
        builder.filter_level(LevelFilter::Info);
    }
    if let Some(spec) = rust_log {
        builder.parse_filters(spec);
    }
    builder.format_timestamp_millis();
    builder
}

/// Initialize `env_logger`
///
/// `RUST_LOG`, when set, takes precedence over the default level.
pub fn init_logging(verbose: bool) {
    let rust_log = std::env::var("RUST_LOG").ok();
    // a second init (tests) is harmless
    let _ = builder(verbose, rust_log.as_deref()).try_init();
}

/// Event sink writing every event to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn report(&mut self, event: Event) {
        match event.severity() {
            Severity::Info => log::info!("{}", event),
            Severity::Warning => log::warn!("{}", event),
        }
    }
}
