// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::time::Duration;

use clap::{Parser, Subcommand};
use env_logger;
use log::info;

use nexstar_elements::bridge_error::BridgeError;
use nexstar_elements::mount_trait::MountTrait;
use nexstar_server::hand_control::{run_jog, DEFAULT_STEP, USAGE};
use nexstar_server::nexstar::{NexStar, DEFAULT_BAUD_RATE,
                              DEFAULT_SERIAL_TIMEOUT};

/// Control functions for the original Celestron NexStar 5 and 8 through the
/// hand controller's RS-232 port. All angles are in degrees.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about=None)]
struct Args {
    /// Serial port of the telescope.
    serial_port: String,

    /// Serial baud rate.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Seconds to wait for each reply from the mount.
    #[arg(long, default_value_t = DEFAULT_SERIAL_TIMEOUT.as_secs_f64())]
    serial_timeout: f64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current altitude and azimuth of the telescope.
    GetAltAz,

    /// Print the current RA and Dec of the telescope (mount must be aligned).
    GetRaDec,

    /// Slew to a specific altitude and azimuth.
    AltAz {
        #[arg(allow_negative_numbers = true)]
        altitude: f64,
        #[arg(allow_negative_numbers = true)]
        azimuth: f64,
    },

    /// Slew to a specific right ascension and declination.
    RaDec {
        #[arg(allow_negative_numbers = true)]
        ra: f64,
        #[arg(allow_negative_numbers = true)]
        dec: f64,
    },

    /// Slew relative to the current altitude and azimuth.
    Relative {
        #[arg(allow_negative_numbers = true)]
        altitude: f64,
        #[arg(allow_negative_numbers = true)]
        azimuth: f64,
    },

    /// Interactive slew control from the keyboard.
    Jog {
        /// Degrees moved per key.
        #[arg(long, default_value_t = DEFAULT_STEP)]
        step: f64,
    },
}

fn main() -> Result<(), BridgeError> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut mount = NexStar::open(&args.serial_port, args.baud,
                                  Duration::from_secs_f64(args.serial_timeout))?;
    match args.command {
        Command::GetAltAz => {
            let position = mount.get_alt_az()?;
            println!("({}, {})", position.alt, position.az);
        }
        Command::GetRaDec => {
            let position = mount.get_ra_dec()?;
            println!("({}, {})", position.ra, position.dec);
        }
        Command::AltAz { altitude, azimuth } => {
            println!("{}", mount.goto_alt_az(altitude, azimuth)?);
        }
        Command::RaDec { ra, dec } => {
            println!("{}", mount.goto_ra_dec(ra, dec)?);
        }
        Command::Relative { altitude, azimuth } => {
            println!("{}", mount.slew_relative(altitude, azimuth)?);
        }
        Command::Jog { step } => {
            println!("{}", USAGE);
            let accepted = run_jog(&mut mount, std::io::stdin().lock(), step)?;
            info!("{} slews accepted", accepted);
        }
    }
    Ok(())
}
