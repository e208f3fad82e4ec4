//! Sampling activity
//!
//! Pulls raw pairs from a [`SampleSource`], converts them to volts and
//! feeds the shared direction estimator. With calibrated ranges loaded it
//! also latches soft-limit reversal requests for the controller.

use eigsep_core::config::{AxisRanges, SamplerConfig};
use eigsep_core::safety::{soft_limit_reached, SampleHealth};
use eigsep_core::sensor::{RawPair, VoltageConverter};
use eigsep_core::state::{Event, EventSink};
use eigsep_core::traits::{SampleError, SampleSource};
use eigsep_core::{Axis, PerAxis};

use crate::shared::SharedState;

/// Sampler step logic
pub struct Sampler {
    converter: VoltageConverter,
    ranges: Option<AxisRanges>,
    health: SampleHealth,
    /// Soft limit condition held on the previous sample
    at_soft_limit: PerAxis<bool>,
}

impl Sampler {
    pub fn new(config: &SamplerConfig, ranges: Option<AxisRanges>) -> Self {
        Self {
            converter: VoltageConverter::summing(config.sum_count),
            ranges,
            health: SampleHealth::new(config.error_report_threshold),
            at_soft_limit: PerAxis::splat(false),
        }
    }

    pub fn converter(&self) -> &VoltageConverter {
        &self.converter
    }

    pub fn health(&self) -> &SampleHealth {
        &self.health
    }

    /// Record one good sample
    pub fn on_sample(&mut self, raw: RawPair, shared: &SharedState, sink: &mut dyn EventSink) {
        self.health.on_success(sink);
        let volts = self.converter.convert(raw);

        let ranges = self.ranges;
        let at_soft_limit = &mut self.at_soft_limit;
        // reported after the lock is released
        let mut reached_now: PerAxis<bool> = PerAxis::splat(false);
        shared.with_sensor(|sensor| {
            sensor.estimator.record_pair(volts);
            sensor.volts = Some(volts);
            sensor.samples += 1;

            let Some(ranges) = ranges else {
                return;
            };
            for axis in Axis::ALL {
                let sensed = sensor.estimator.direction(axis);
                let reached = soft_limit_reached(&ranges[axis], sensed, volts[axis]);
                if reached {
                    sensor.reverse_requested[axis] = true;
                    reached_now[axis] = !at_soft_limit[axis];
                }
                at_soft_limit[axis] = reached;
            }
        });

        for axis in Axis::ALL {
            if reached_now[axis] {
                sink.report(Event::SoftLimitReached {
                    axis,
                    volts: volts[axis],
                });
            }
        }
    }

    /// Account for a failed read
    pub fn on_error(&mut self, error: SampleError, sink: &mut dyn EventSink) {
        self.health.on_error(error, sink);
    }
}

/// Sampler loop; returns once shutdown is requested
///
/// Read failures never end the loop: each read is bounded by the
/// source's own timeout, after which the shutdown flag is checked again.
pub async fn run_sampler<S: SampleSource>(
    mut source: S,
    mut sampler: Sampler,
    shared: &SharedState,
    sink: &mut dyn EventSink,
) {
    log::debug!("Sampler started");
    while !shared.shutdown.is_requested() {
        match source.next_sample().await {
            Ok(raw) => sampler.on_sample(raw, shared, sink),
            Err(err) => {
                log::debug!("Sample read failed: {}", err);
                sampler.on_error(err, sink);
            }
        }
    }
    log::debug!(
        "Sampler stopped ({} read failures)",
        sampler.health().total_failures()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use eigsep_core::config::{EstimatorConfig, VoltageRange};
    use eigsep_core::sensor::Direction;

    fn raw(sampler: &Sampler, az: f32, alt: f32) -> RawPair {
        let c = sampler.converter();
        let sum = |v: f32| c.volt2bit(v) as i64 * c.sum_count as i64;
        RawPair::new(sum(az), sum(alt))
    }

    fn ranges() -> AxisRanges {
        PerAxis::new(
            VoltageRange::new(Axis::Az, 0.8, 1.6).unwrap(),
            VoltageRange::new(Axis::Alt, 0.8, 1.6).unwrap(),
        )
    }

    #[test]
    fn test_samples_feed_estimator() {
        let shared = SharedState::new(&EstimatorConfig::default());
        let mut sampler = Sampler::new(&SamplerConfig::default(), None);
        let mut events: heapless::Vec<Event, 8> = heapless::Vec::new();

        for i in 0..5 {
            let r = raw(&sampler, 1.0 + 0.01 * i as f32, 1.2 - 0.01 * i as f32);
            sampler.on_sample(r, &shared, &mut events);
        }

        let snapshot = shared.snapshot();
        assert_eq!(snapshot.directions[Axis::Az], Direction::Forward);
        assert_eq!(snapshot.directions[Axis::Alt], Direction::Reverse);
        let volts = snapshot.volts.unwrap();
        assert!((volts[Axis::Az] - 1.04).abs() < 1e-3);
        assert!(events.is_empty());
        assert_eq!(shared.with_sensor(|s| s.samples), 5);
    }

    #[test]
    fn test_soft_limit_latches_request_once() {
        let shared = SharedState::new(&EstimatorConfig::default());
        let mut sampler = Sampler::new(&SamplerConfig::default(), Some(ranges()));
        let mut events: heapless::Vec<Event, 8> = heapless::Vec::new();

        for i in 0..8 {
            let r = raw(&sampler, 1.56 + 0.01 * i as f32, 1.2);
            sampler.on_sample(r, &shared, &mut events);
        }

        let soft: heapless::Vec<_, 8> = events
            .iter()
            .filter(|e| matches!(e, Event::SoftLimitReached { .. }))
            .collect();
        assert_eq!(soft.len(), 1);
        assert_eq!(soft[0].axis(), Some(Axis::Az));

        let snapshot = shared.snapshot();
        assert!(snapshot.reverse_requested[Axis::Az]);
        assert!(!snapshot.reverse_requested[Axis::Alt]);
    }

    /// Sink that reads the shared state while handling an event
    struct ReadingSink<'a> {
        shared: &'a SharedState,
        seen: Vec<(Event, u64)>,
    }

    impl EventSink for ReadingSink<'_> {
        fn report(&mut self, event: Event) {
            let samples = self.shared.with_sensor(|s| s.samples);
            self.seen.push((event, samples));
        }
    }

    #[test]
    fn test_soft_limit_reported_outside_lock() {
        let shared = SharedState::new(&EstimatorConfig::default());
        let mut sampler = Sampler::new(&SamplerConfig::default(), Some(ranges()));
        let mut sink = ReadingSink {
            shared: &shared,
            seen: Vec::new(),
        };

        for i in 0..8 {
            let r = raw(&sampler, 1.2, 1.56 + 0.01 * i as f32);
            sampler.on_sample(r, &shared, &mut sink);
        }

        assert_eq!(sink.seen.len(), 1);
        let (event, samples) = sink.seen[0];
        assert_eq!(event.axis(), Some(Axis::Alt));
        assert!(samples >= 5);
    }

    #[test]
    fn test_no_soft_limit_when_moving_away() {
        let shared = SharedState::new(&EstimatorConfig::default());
        let mut sampler = Sampler::new(&SamplerConfig::default(), Some(ranges()));
        let mut events: heapless::Vec<Event, 8> = heapless::Vec::new();

        // above max, but heading back into the range
        for i in 0..8 {
            let r = raw(&sampler, 1.7 - 0.01 * i as f32, 1.2);
            sampler.on_sample(r, &shared, &mut events);
        }
        assert!(events.is_empty());
        assert!(!shared.snapshot().reverse_requested[Axis::Az]);
    }

    #[test]
    fn test_errors_reported_then_recovered() {
        let shared = SharedState::new(&EstimatorConfig::default());
        let config = SamplerConfig {
            error_report_threshold: 2,
            ..Default::default()
        };
        let mut sampler = Sampler::new(&config, None);
        let mut events: heapless::Vec<Event, 8> = heapless::Vec::new();

        sampler.on_error(SampleError::Timeout, &mut events);
        assert!(events.is_empty());
        sampler.on_error(SampleError::Timeout, &mut events);
        assert_eq!(events[0], Event::SampleTimeout { consecutive: 2 });

        let r = raw(&sampler, 1.0, 1.0);
        sampler.on_sample(r, &shared, &mut events);
        assert_eq!(events[1], Event::SampleRecovered { failures: 2 });
    }

    struct ScriptedSource<'a> {
        samples: std::vec::IntoIter<Result<RawPair, SampleError>>,
        shared: &'a SharedState,
    }

    impl SampleSource for ScriptedSource<'_> {
        async fn next_sample(&mut self) -> Result<RawPair, SampleError> {
            match self.samples.next() {
                Some(sample) => sample,
                None => {
                    self.shared.shutdown.request();
                    Err(SampleError::Timeout)
                }
            }
        }
    }

    #[test]
    fn test_run_sampler_until_shutdown() {
        let shared = SharedState::new(&EstimatorConfig::default());
        let sampler = Sampler::new(&SamplerConfig::default(), None);
        let pair = raw(&sampler, 1.0, 1.5);
        let source = ScriptedSource {
            samples: vec![Ok(pair), Err(SampleError::Malformed), Ok(pair)].into_iter(),
            shared: &shared,
        };

        embassy_futures::block_on(run_sampler(source, sampler, &shared, &mut ()));
        assert_eq!(shared.with_sensor(|s| s.samples), 2);
    }
}
