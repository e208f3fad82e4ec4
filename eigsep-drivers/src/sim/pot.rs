//! Simulated potentiometer sample source

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Instant, Timer};

use eigsep_core::sensor::{RawPair, VoltageConverter};
use eigsep_core::traits::{SampleError, SampleSource};

use super::mount::SharedMount;

/// Sample source reading a simulated mount
///
/// Produces summed ADC codes in the same form as the remote ADC, one
/// pair per `period`.
pub struct SimPot<'a, M: RawMutex> {
    mount: &'a SharedMount<M>,
    converter: VoltageConverter,
    period: Duration,
}

impl<'a, M: RawMutex> SimPot<'a, M> {
    pub fn new(mount: &'a SharedMount<M>, converter: VoltageConverter, period: Duration) -> Self {
        Self {
            mount,
            converter,
            period,
        }
    }

    /// Advance the mount to `now_ms` and sample it
    pub fn sample_at(&mut self, now_ms: u32) -> RawPair {
        let volts = self.mount.lock(|mount| {
            let mut mount = mount.borrow_mut();
            mount.advance(now_ms);
            mount.read()
        });
        let sum = |v: f32| self.converter.volt2bit(v) as i64 * self.converter.sum_count.max(1) as i64;
        RawPair::new(sum(volts.az), sum(volts.alt))
    }
}

impl<M: RawMutex> SampleSource for SimPot<'_, M> {
    async fn next_sample(&mut self) -> Result<RawPair, SampleError> {
        Timer::after(self.period).await;
        Ok(self.sample_at(Instant::now().as_millis() as u32))
    }
}
