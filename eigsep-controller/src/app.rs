//! Command sessions
//!
//! Builds the board, the sample source and the shared state for one
//! command and runs it to completion. Ctrl-C requests a cooperative
//! shutdown; motors are always stopped and released before returning.

use core::fmt::Debug;
use std::io::Write;

use embassy_futures::join::join;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Duration;
use static_cell::StaticCell;

use eigsep_core::config::AxisRanges;
use eigsep_core::safety::SampleHealth;
use eigsep_core::sensor::{RawPair, VoltageConverter};
use eigsep_core::traits::{MotorBackend, RangeStore, SampleError, SampleSource};
use eigsep_core::{AxisSet, PerAxis};
use eigsep_drivers::sim::{SharedMount, SimDriver, SimMount, SimPot};
use eigsep_drivers::Motor;

use crate::calibrate::{calibrate_and_store, Calibrator};
use crate::cli::{Cli, Command};
use crate::config::{AppConfig, BoardKind};
use crate::controller::{run_controller, Controller, ControllerConfig, MotorGuard};
use crate::error::{ControllerError, ControllerResult};
use crate::logging::LogSink;
use crate::sampler::{run_sampler, Sampler};
use crate::shared::{SharedState, Shutdown};
use crate::store::TomlRangeStore;
use crate::transport::{spawn_serial_reader, ChannelSource, SampleChannel};

pub type SimMountCell = SharedMount<CriticalSectionRawMutex>;

static SHARED: StaticCell<SharedState> = StaticCell::new();
static SIM_MOUNT: StaticCell<SimMountCell> = StaticCell::new();
static SAMPLES: SampleChannel = SampleChannel::new();

impl From<&AppConfig> for ControllerConfig {
    fn from(config: &AppConfig) -> Self {
        ControllerConfig {
            control: config.control,
            supervisor: config.supervisor,
            stall: config.stall,
            regulator: config.regulator,
        }
    }
}

/// Load the configuration file and apply command line overrides
pub fn configure(cli: &Cli) -> ControllerResult<AppConfig> {
    let mut config = AppConfig::load(&cli.config)?;
    if let Some(board) = cli.board {
        config.board.kind = board;
    }
    if let Some(port) = &cli.port {
        config.serial.port = port.clone();
    }
    if let Command::Calibrate {
        delta: Some(delta), ..
    } = cli.command
    {
        config.calibration.delta = delta;
    }
    config.validate()?;
    Ok(config)
}

/// Sample source of the active board
pub enum PotSource {
    Serial(ChannelSource<'static>),
    Sim(SimPot<'static, CriticalSectionRawMutex>),
}

impl SampleSource for PotSource {
    async fn next_sample(&mut self) -> Result<RawPair, SampleError> {
        match self {
            PotSource::Serial(source) => source.next_sample().await,
            PotSource::Sim(source) => source.next_sample().await,
        }
    }
}

/// Work that needs a motor backend, whichever board provides it
#[allow(async_fn_in_trait)]
pub trait MotorApp {
    async fn run<M>(self, motor: M) -> ControllerResult<()>
    where
        M: MotorBackend,
        M::Error: Debug;
}

/// Process-wide state of one command
pub struct Session {
    config: AppConfig,
    shared: &'static SharedState,
    mount: Option<&'static SimMountCell>,
}

impl Session {
    /// Set up shared state and the Ctrl-C handler
    ///
    /// May only be called once per process.
    pub fn new(config: AppConfig) -> ControllerResult<Self> {
        let shared: &'static SharedState = SHARED.init(SharedState::new(&config.estimator));
        let mount = match config.board.kind {
            BoardKind::Sim => {
                let mount: &'static SimMountCell =
                    SIM_MOUNT.init(SimMount::new(config.board.sim.mount_config()).shared());
                Some(mount)
            }
            _ => None,
        };

        let shutdown = &shared.shutdown;
        ctrlc::set_handler(move || shutdown.request())?;

        Ok(Self {
            config,
            shared,
            mount,
        })
    }

    fn converter(&self) -> VoltageConverter {
        VoltageConverter::summing(self.config.sampler.sum_count)
    }

    fn open_source(&self) -> ControllerResult<PotSource> {
        let sampler = &self.config.sampler;
        if let Some(mount) = self.mount {
            let period = Duration::from_millis(sampler.period_ms as u64);
            return Ok(PotSource::Sim(SimPot::new(mount, self.converter(), period)));
        }
        let timeout = Duration::from_millis(sampler.read_timeout_ms as u64);
        spawn_serial_reader(&self.config.serial, timeout, &SAMPLES, &self.shared.shutdown)?;
        Ok(PotSource::Serial(ChannelSource::new(&SAMPLES, timeout)))
    }

    fn load_ranges(&self) -> ControllerResult<Option<AxisRanges>> {
        let mut store = TomlRangeStore::new(&self.config.calibration.ranges_path);
        let ranges = store.load()?;
        match &ranges {
            Some(r) => log::info!(
                "Voltage ranges: az {:.3}..{:.3} V, alt {:.3}..{:.3} V",
                r.az.min(),
                r.az.max(),
                r.alt.min(),
                r.alt.max()
            ),
            None => log::warn!(
                "No calibrated ranges in {}, soft limits disabled",
                store.path().display()
            ),
        }
        Ok(ranges)
    }

    async fn with_motor<A: MotorApp>(&self, app: A) -> ControllerResult<()> {
        match (self.config.board.kind, self.mount) {
            (BoardKind::Sim, Some(mount)) => {
                app.run(Motor::new(SimDriver::new(mount), self.config.motor))
                    .await
            }
            #[cfg(feature = "rpi")]
            (BoardKind::Hbridge, _) => {
                let motor = crate::hardware::open_hbridge(&self.config.board, self.config.motor)?;
                app.run(motor).await
            }
            #[cfg(feature = "rpi")]
            (BoardKind::Scmd, _) => {
                let motor = crate::hardware::open_scmd(&self.config.board, self.config.motor)?;
                app.run(motor).await
            }
            (kind, _) => Err(ControllerError::BoardUnavailable(kind.name())),
        }
    }

    /// Run one command to completion
    pub async fn execute(self, command: Command) -> ControllerResult<()> {
        log::info!("Board: {}", self.config.board.kind.name());
        match command {
            Command::Run { az, alt, no_pot } => {
                let source = if no_pot {
                    None
                } else {
                    Some(self.open_source()?)
                };
                let ranges = self.load_ranges()?;
                let app = RunApp {
                    config: &self.config,
                    shared: self.shared,
                    velocities: PerAxis::new(az, alt),
                    source,
                    ranges,
                };
                self.with_motor(app).await
            }
            Command::ReadPot => {
                let source = self.open_source()?;
                let mut stdout = std::io::stdout();
                read_pot(
                    source,
                    self.converter(),
                    self.config.sampler.error_report_threshold,
                    &mut stdout,
                    &self.shared.shutdown,
                )
                .await;
                Ok(())
            }
            Command::Calibrate { .. } => {
                let axes = command.calibration_axes();
                if axes.is_empty() {
                    return Err(ControllerError::NoAxisSelected);
                }
                let app = CalibrateApp {
                    config: &self.config,
                    shutdown: &self.shared.shutdown,
                    converter: self.converter(),
                    source: self.open_source()?,
                    axes,
                };
                self.with_motor(app).await
            }
        }
    }
}

/// Fixed-velocity run under supervision
struct RunApp<'a> {
    config: &'a AppConfig,
    shared: &'a SharedState,
    velocities: PerAxis<i32>,
    source: Option<PotSource>,
    ranges: Option<AxisRanges>,
}

impl MotorApp for RunApp<'_> {
    async fn run<M>(self, motor: M) -> ControllerResult<()>
    where
        M: MotorBackend,
        M::Error: Debug,
    {
        let mut guard = MotorGuard::new(motor);
        let mut sink = LogSink;
        guard
            .motor()
            .set_velocity(self.velocities, &mut sink)
            .map_err(ControllerError::motor)?;

        let controller = Controller::new(&ControllerConfig::from(self.config), self.ranges);
        match self.source {
            Some(source) => {
                let sampler = Sampler::new(&self.config.sampler, self.ranges);
                let mut sampler_sink = LogSink;
                let (_, result) = join(
                    run_sampler(source, sampler, self.shared, &mut sampler_sink),
                    run_controller(controller, &mut guard, self.shared, &mut sink),
                )
                .await;
                result
            }
            None => {
                log::warn!("Potentiometers not monitored, limits are not supervised");
                run_controller(controller.unsupervised(), &mut guard, self.shared, &mut sink)
                    .await
            }
        }
    }
}

/// Range calibration of the selected axes
struct CalibrateApp<'a> {
    config: &'a AppConfig,
    shutdown: &'a Shutdown,
    converter: VoltageConverter,
    source: PotSource,
    axes: AxisSet,
}

impl MotorApp for CalibrateApp<'_> {
    async fn run<M>(mut self, motor: M) -> ControllerResult<()>
    where
        M: MotorBackend,
        M::Error: Debug,
    {
        let mut guard = MotorGuard::new(motor);
        let mut store = TomlRangeStore::new(&self.config.calibration.ranges_path);
        let result = {
            let mut calibrator = Calibrator::new(
                guard.motor(),
                &mut self.source,
                self.converter,
                &self.config.estimator,
                &self.config.calibration,
                self.shutdown,
            );
            calibrate_and_store(&mut calibrator, self.axes, &mut store, &mut LogSink).await
        };
        let released = guard.release().map_err(ControllerError::motor);
        result?;
        released?;
        log::info!("Stored ranges in {}", store.path().display());
        Ok(())
    }
}

/// Print both voltages once per sample until shutdown
pub async fn read_pot<S: SampleSource>(
    mut source: S,
    converter: VoltageConverter,
    error_report_threshold: u32,
    out: &mut impl Write,
    shutdown: &Shutdown,
) {
    let mut health = SampleHealth::new(error_report_threshold);
    let mut sink = LogSink;
    while !shutdown.is_requested() {
        match source.next_sample().await {
            Ok(raw) => {
                health.on_success(&mut sink);
                let volts = converter.convert(raw);
                if writeln!(out, "az: {:.3}, alt: {:.3}", volts.az, volts.alt).is_err() {
                    break;
                }
            }
            Err(err) => health.on_error(err, &mut sink),
        }
    }
}

/// Entry point of the binary
pub async fn main(cli: Cli) -> ControllerResult<()> {
    let config = configure(&cli)?;
    Session::new(config)?.execute(cli.command).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct Scripted<'a> {
        samples: Vec<Result<RawPair, SampleError>>,
        shutdown: &'a Shutdown,
    }

    impl SampleSource for Scripted<'_> {
        async fn next_sample(&mut self) -> Result<RawPair, SampleError> {
            if self.samples.len() <= 1 {
                self.shutdown.request();
            }
            self.samples.pop().unwrap_or(Err(SampleError::Timeout))
        }
    }

    #[test]
    fn test_read_pot_prints_volts() {
        let converter = VoltageConverter::default();
        let shutdown = Shutdown::new();
        let half = (converter.max_code() / 2) as i64;
        let source = Scripted {
            samples: vec![Ok(RawPair::new(0, half)), Err(SampleError::Malformed)],
            shutdown: &shutdown,
        };
        let mut out = Vec::new();

        embassy_futures::block_on(read_pot(source, converter, 5, &mut out, &shutdown));

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "az: 0.000, alt: 1.650\n");
    }

    #[test]
    fn test_cli_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eigsep.toml");
        std::fs::write(&path, "[board]\nkind = \"scmd\"\n[serial]\nport = \"/dev/ttyUSB0\"\n")
            .unwrap();
        let cli = Cli {
            config: path,
            board: Some(BoardKind::Sim),
            port: Some("/dev/ttyACM1".into()),
            verbose: false,
            command: Command::Calibrate {
                az: true,
                alt: false,
                delta: Some(0.05),
            },
        };
        let config = configure(&cli).unwrap();
        assert_eq!(config.board.kind, BoardKind::Sim);
        assert_eq!(config.serial.port, "/dev/ttyACM1");
        assert_eq!(config.calibration.delta, 0.05);
    }

    #[test]
    fn test_negative_delta_rejected() {
        let cli = Cli {
            config: PathBuf::from("/nonexistent/eigsep.toml"),
            board: None,
            port: None,
            verbose: false,
            command: Command::Calibrate {
                az: true,
                alt: true,
                delta: Some(-1.0),
            },
        };
        assert!(matches!(
            configure(&cli),
            Err(ControllerError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_controller_config_from_app() {
        let mut config = AppConfig::default();
        config.stall.reverse_on_stall = true;
        let controller: ControllerConfig = (&config).into();
        assert!(controller.stall.reverse_on_stall);
        assert_eq!(controller.control, config.control);
    }
}
