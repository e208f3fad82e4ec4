//! Command line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use eigsep_core::{Axis, AxisSet, PerAxis};

use crate::config::BoardKind;

/// Two-axis mount controller with inferred limit detection
#[derive(Parser, Debug)]
#[command(name = "eigsep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "eigsep.toml")]
    pub config: PathBuf,

    /// Motor board (overrides the configuration file)
    #[arg(short, long, value_enum)]
    pub board: Option<BoardKind>,

    /// Serial port of the pot ADC (overrides the configuration file)
    #[arg(short, long)]
    pub port: Option<String>,

    /// enable debug messages
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Drive both axes at fixed velocities until interrupted
    Run {
        /// Azimuth velocity
        #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
        az: i32,

        /// Altitude velocity
        #[arg(
            short = 'e',
            long,
            visible_alias = "el",
            default_value_t = 0,
            allow_negative_numbers = true
        )]
        alt: i32,

        /// Do not read the pots; limits are not supervised
        #[arg(long)]
        no_pot: bool,
    },

    /// Print both pot voltages until interrupted
    ReadPot,

    /// Measure the voltage range of the selected axes
    Calibrate {
        /// Calibrate the azimuth axis
        #[arg(long)]
        az: bool,

        /// Calibrate the altitude axis
        #[arg(long, visible_alias = "el")]
        alt: bool,

        /// Margin taken off each measured end in volts (overrides the configuration file)
        #[arg(long)]
        delta: Option<f32>,
    },
}

impl Command {
    /// Velocities requested by `run`
    pub fn velocities(&self) -> Option<PerAxis<i32>> {
        match *self {
            Command::Run { az, alt, .. } => Some(PerAxis::new(az, alt)),
            _ => None,
        }
    }

    /// Axes selected for `calibrate`
    pub fn calibration_axes(&self) -> AxisSet {
        let mut axes = AxisSet::EMPTY;
        if let Command::Calibrate { az, alt, .. } = *self {
            if az {
                axes.insert(Axis::Az);
            }
            if alt {
                axes.insert(Axis::Alt);
            }
        }
        axes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_negative_velocity() {
        let cli = Cli::try_parse_from(["eigsep", "run", "--az", "-120", "-e", "80"]).unwrap();
        assert_eq!(cli.command.velocities(), Some(PerAxis::new(-120, 80)));
        assert_eq!(cli.config, PathBuf::from("eigsep.toml"));
        assert_eq!(cli.board, None);
    }

    #[test]
    fn test_run_el_alias_and_no_pot() {
        let cli = Cli::try_parse_from(["eigsep", "run", "--el", "-50", "--no-pot"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Run {
                az: 0,
                alt: -50,
                no_pot: true
            }
        );
    }

    #[test]
    fn test_board_aliases() {
        let cli = Cli::try_parse_from(["eigsep", "--board", "qwiic", "read-pot"]).unwrap();
        assert_eq!(cli.board, Some(BoardKind::Scmd));
        let cli = Cli::try_parse_from(["eigsep", "-b", "sim", "-v", "read-pot"]).unwrap();
        assert_eq!(cli.board, Some(BoardKind::Sim));
        assert!(cli.verbose);
    }

    #[test]
    fn test_calibrate_axes() {
        let cli = Cli::try_parse_from(["eigsep", "calibrate", "--alt", "--delta", "0.05"]).unwrap();
        assert_eq!(cli.command.calibration_axes(), AxisSet::only(Axis::Alt));
        let cli = Cli::try_parse_from(["eigsep", "calibrate"]).unwrap();
        assert!(cli.command.calibration_axes().is_empty());
    }

    #[test]
    fn test_unknown_board_rejected() {
        assert!(Cli::try_parse_from(["eigsep", "--board", "stepper", "read-pot"]).is_err());
    }
}
