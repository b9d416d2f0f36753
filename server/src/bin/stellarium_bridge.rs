// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{error, info};
use pico_args::Arguments;
use tracing_appender::non_blocking::NonBlockingBuilder;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, registry, EnvFilter};

use nexstar_elements::bridge_error::BridgeResult;
use nexstar_server::nexstar::{NexStar, DEFAULT_BAUD_RATE,
                              DEFAULT_SERIAL_TIMEOUT};
use nexstar_server::stellarium_server::{SharedMount, StellariumServer,
                                        DEFAULT_PORT, DEFAULT_READ_TIMEOUT};

struct AppArgs {
    serial_port: String,
    baud: u32,
    port: u16,
    read_timeout: Duration,
    serial_timeout: Duration,
    log_dir: String,
    log_file: String,
}

fn parse_duration(arg: &str)
                  -> Result<std::time::Duration, std::num::ParseFloatError> {
    let seconds = arg.parse()?;
    Ok(std::time::Duration::from_secs_f64(seconds))
}

fn main() {
    const HELP: &str = "\
    Bridges a Stellarium telescope client to a NexStar 5/8 mount.

    FLAGS:
      -h, --help                     Prints help information

    OPTIONS:
      --serial_port <path>           Required, e.g. /dev/ttyUSB0
      --baud NUMBER                  9600
      --port NUMBER                  10001
      --read_timeout NUMBER          4.0 (seconds)
      --serial_timeout NUMBER        3.0 (seconds)
      --log_dir <path>               .
      --log_file <file>              stellarium_bridge_log.txt
    ";

    let mut pargs = Arguments::from_env();
    if pargs.contains(["-h", "--help"]) {
        println!("{}", HELP);
        std::process::exit(0);
    }
    let serial_port = match pargs.value_from_str("--serial_port") {
        Ok(serial_port) => serial_port,
        Err(e) => {
            eprintln!("{}\n{}", e, HELP);
            std::process::exit(1);
        }
    };
    let args = AppArgs {
        serial_port,
        baud: pargs.value_from_str("--baud").
            unwrap_or(DEFAULT_BAUD_RATE),
        port: pargs.value_from_str("--port").
            unwrap_or(DEFAULT_PORT),
        read_timeout: pargs.value_from_fn("--read_timeout", parse_duration).
            unwrap_or(DEFAULT_READ_TIMEOUT),
        serial_timeout: pargs.value_from_fn("--serial_timeout", parse_duration).
            unwrap_or(DEFAULT_SERIAL_TIMEOUT),
        log_dir: pargs.value_from_str("--log_dir").
            unwrap_or(".".to_string()),
        log_file: pargs.value_from_str("--log_file").
            unwrap_or("stellarium_bridge_log.txt".to_string()),
    };
    let remaining = pargs.finish();
    if !remaining.is_empty() {
        eprintln!("Unrecognized arguments: {:?}\n{}", remaining, HELP);
        std::process::exit(1);
    }

    // Set up logging.
    let file_appender = match RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(&args.log_file)
        .max_log_files(10)
        .build(&args.log_dir)
    {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Could not create log file in {}: {}", args.log_dir, e);
            std::process::exit(1);
        }
    };

    // Create non-blocking writers for both the file and stdout
    let (non_blocking_file, _guard1) = NonBlockingBuilder::default()
        .lossy(false)
        .finish(file_appender);
    let (non_blocking_stdout, _guard2) = NonBlockingBuilder::default()
        .lossy(false)
        .finish(std::io::stdout());
    registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(non_blocking_stdout))
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking_file))
        .init();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Got control-c");
        std::thread::sleep(Duration::from_millis(200));
        info!("Exiting");
        std::process::exit(-1);
    }) {
        error!("Could not install control-c handler: {}", e);
    }

    if let Err(e) = async_main(args) {
        error!("Stellarium bridge stopped: {}", e);
        drop(_guard1);
        drop(_guard2);
        std::process::exit(1);
    }
}

#[tokio::main]
async fn async_main(args: AppArgs) -> BridgeResult<()> {
    // The mount is opened once and lives until the process exits.
    let nexstar = NexStar::open(&args.serial_port, args.baud, args.serial_timeout)?;
    let mount: SharedMount = Arc::new(Mutex::new(nexstar));

    let server = StellariumServer::new(mount, args.port, args.read_timeout);
    server.serve_requests().await
}
