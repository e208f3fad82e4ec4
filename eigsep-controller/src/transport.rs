//! Serial sample transport
//!
//! A blocking reader thread decodes the ADC stream and forwards samples
//! into a channel; the sampler awaits the channel with a timeout.

use std::io::{self, Read};
use std::thread;
use std::time::Duration as StdDuration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use embassy_time::{with_timeout, Duration};

use eigsep_core::sensor::RawPair;
use eigsep_core::traits::{SampleError, SampleSource};
use eigsep_protocol::SampleDecoder;

use crate::config::SerialConfig;
use crate::error::{ControllerError, ControllerResult};
use crate::shared::Shutdown;

/// Samples buffered between the reader thread and the sampler
pub const SAMPLE_QUEUE_LEN: usize = 16;

/// Pause after an I/O error before reading again
const IO_RETRY_DELAY: StdDuration = StdDuration::from_millis(100);

pub type SampleChannel =
    Channel<CriticalSectionRawMutex, Result<RawPair, SampleError>, SAMPLE_QUEUE_LEN>;

/// Queue a sample, dropping the oldest one when the queue is full
fn push(channel: &SampleChannel, item: Result<RawPair, SampleError>) {
    if let Err(TrySendError::Full(item)) = channel.try_send(item) {
        let _ = channel.try_receive();
        let _ = channel.try_send(item);
    }
}

/// Decode `reader` into `channel` until shutdown or end of stream
pub fn pump<R: Read>(
    mut reader: R,
    mut decoder: SampleDecoder,
    channel: &SampleChannel,
    shutdown: &Shutdown,
) {
    let mut buf = [0u8; 64];
    while !shutdown.is_requested() {
        match reader.read(&mut buf) {
            Ok(0) => {
                log::warn!("Sample stream closed");
                break;
            }
            Ok(n) => {
                for &byte in &buf[..n] {
                    if let Some(result) = decoder.feed(byte) {
                        push(
                            channel,
                            result.map_err(|err| {
                                log::debug!("Bad sample: {}", err);
                                SampleError::Malformed
                            }),
                        );
                    }
                }
            }
            // a gap this long means any partial frame is stale
            Err(err) if err.kind() == io::ErrorKind::TimedOut => decoder.reset(),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => {
                log::warn!("Serial read failed: {}", err);
                push(channel, Err(SampleError::Io));
                thread::sleep(IO_RETRY_DELAY);
            }
        }
    }
    log::debug!("Serial reader stopped");
}

/// Open the serial port and start the reader thread
pub fn spawn_serial_reader(
    config: &SerialConfig,
    read_timeout: Duration,
    channel: &'static SampleChannel,
    shutdown: &'static Shutdown,
) -> ControllerResult<thread::JoinHandle<()>> {
    let port = serialport::new(&config.port, config.baud_rate)
        .timeout(StdDuration::from_millis(read_timeout.as_millis()))
        .open()
        .map_err(|source| ControllerError::Serial {
            port: config.port.clone(),
            source,
        })?;
    log::info!(
        "Reading {:?} samples from {} at {} baud",
        config.format,
        config.port,
        config.baud_rate
    );
    let decoder = SampleDecoder::new(config.format);
    Ok(thread::spawn(move || pump(port, decoder, channel, shutdown)))
}

/// Sample source fed by the reader thread
pub struct ChannelSource<'a> {
    channel: &'a SampleChannel,
    timeout: Duration,
}

impl<'a> ChannelSource<'a> {
    pub fn new(channel: &'a SampleChannel, timeout: Duration) -> Self {
        Self { channel, timeout }
    }
}

impl SampleSource for ChannelSource<'_> {
    async fn next_sample(&mut self) -> Result<RawPair, SampleError> {
        match with_timeout(self.timeout, self.channel.receive()).await {
            Ok(sample) => sample,
            Err(_) => Err(SampleError::Timeout),
        }
    }
}
