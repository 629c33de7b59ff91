use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use semver::Version;
use slog::{Drain, Level, Logger};
use slog_scope::{info, warn};
use tokio_util::sync::CancellationToken;

use cardano_conductor::device::{
    BridgeDeviceProbe, DeviceHandshake, DeviceVendor, FixedBackoff, HandshakeOptions,
};
use cardano_conductor::{
    catalog, BinaryConfig, ExternalBinary, Invokable, OutputMode, Resolvable, StdResult,
    Supervisable,
};

#[derive(Parser, Debug, Clone)]
#[command(about = "Orchestrate the external Cardano ecosystem binaries")]
pub struct Args {
    #[command(subcommand)]
    command: ConductorCommand,

    /// Verbosity level, add more v to increase
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug, Clone)]
enum ConductorCommand {
    /// Resolve a binary, run it through the version gate and print the
    /// parsed version
    Version {
        /// Name of the binary (searched in PATH unless --path is given)
        binary: String,

        /// Explicit path to the executable
        #[clap(long)]
        path: Option<PathBuf>,

        /// Override of the minimum supported version
        #[clap(long)]
        minimum: Option<Version>,
    },

    /// Detect a connected hardware wallet and validate its firmware
    DeviceCheck {
        /// Explicit path to the hardware-wallet bridge executable
        #[clap(long)]
        path: Option<PathBuf>,

        /// Reject any device that is not of this vendor
        #[clap(long, value_enum)]
        vendor: Option<DeviceVendor>,

        /// Retry budget of the polling loop
        #[clap(long, default_value_t = 10)]
        max_attempts: u32,

        /// Delay between two polls, in seconds
        #[clap(long, default_value_t = 10)]
        delay: u64,
    },

    /// Launch a daemon binary and supervise it until interrupted
    Run {
        /// Name of the binary (searched in PATH unless --path is given)
        binary: String,

        /// Explicit path to the executable
        #[clap(long)]
        path: Option<PathBuf>,

        /// Override of the minimum supported version
        #[clap(long)]
        minimum: Option<Version>,

        /// Working directory of the daemon, created if missing
        #[clap(long)]
        work_directory: Option<PathBuf>,

        /// Print the daemon stdout line by line instead of discarding it
        #[clap(long)]
        stream: bool,

        /// Arguments passed through to the daemon, unmodified
        #[clap(last = true)]
        args: Vec<String>,
    },
}

impl Args {
    fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::Error,
            1 => Level::Warning,
            2 => Level::Info,
            3 => Level::Debug,
            _ => Level::Trace,
        }
    }
}

#[tokio::main]
async fn main() -> StdResult<()> {
    let args = Args::parse();
    let _guard = slog_scope::set_global_logger(build_logger(&args));

    match args.command.clone() {
        ConductorCommand::Version {
            binary,
            path,
            minimum,
        } => check_version(&binary, path, minimum).await,
        ConductorCommand::DeviceCheck {
            path,
            vendor,
            max_attempts,
            delay,
        } => device_check(path, vendor, max_attempts, delay).await,
        ConductorCommand::Run {
            binary,
            path,
            minimum,
            work_directory,
            stream,
            args,
        } => run_daemon(&binary, path, minimum, work_directory, stream, args).await,
    }
}

fn binary_config(
    name: &str,
    path: Option<PathBuf>,
    minimum: Option<Version>,
) -> BinaryConfig {
    let mut config = catalog::known_binary(name)
        .unwrap_or_else(|| BinaryConfig::new(name, Version::new(0, 0, 0)));
    if let Some(path) = path {
        config = config.with_explicit_path(&path);
    }
    if let Some(minimum) = minimum {
        config.minimum_version = minimum;
    }

    config
}

async fn check_version(
    name: &str,
    path: Option<PathBuf>,
    minimum: Option<Version>,
) -> StdResult<()> {
    let facade = ExternalBinary::connect(binary_config(name, path, minimum))
        .await
        .with_context(|| format!("`{name}` failed the version gate"))?;

    println!("{name} {}", facade.version());

    Ok(())
}

async fn device_check(
    path: Option<PathBuf>,
    vendor: Option<DeviceVendor>,
    max_attempts: u32,
    delay: u64,
) -> StdResult<()> {
    let mut config = catalog::hardware_wallet_bridge();
    if let Some(path) = path {
        config = config.with_explicit_path(&path);
    }
    let bridge = ExternalBinary::connect(config)
        .await
        .with_context(|| "hardware-wallet bridge is not usable")?;
    let probe =
        BridgeDeviceProbe::new(bridge.invocation(&catalog::bridge_device_status_args()));

    let cancellation_token = CancellationToken::new();
    let cloned_token = cancellation_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cloned_token.cancel();
        }
    });

    let handshake = DeviceHandshake::new(HandshakeOptions {
        max_attempts,
        required_vendor: vendor,
        ..Default::default()
    })
    .with_backoff(Box::new(FixedBackoff::new(Duration::from_secs(delay))));
    let session = handshake.run(&probe, &cancellation_token).await?;

    println!(
        "{} device detected, reported version {} ({} attempt(s))",
        session.vendor, session.reported_version, session.attempts_used
    );

    Ok(())
}

async fn run_daemon(
    name: &str,
    path: Option<PathBuf>,
    minimum: Option<Version>,
    work_directory: Option<PathBuf>,
    stream: bool,
    args: Vec<String>,
) -> StdResult<()> {
    let mut config = binary_config(name, path, minimum);
    if let Some(work_directory) = work_directory {
        config = config.with_work_dir(&work_directory);
    }
    let facade = ExternalBinary::connect(config)
        .await
        .with_context(|| format!("`{name}` failed the version gate"))?;

    let output_mode = if stream {
        OutputMode::Streamed
    } else {
        OutputMode::Suppressed
    };
    let mut supervisor = facade.supervisor(output_mode);
    let invocation = facade.invocation(&args);
    let output = supervisor.start(&invocation).await?;
    info!("{} is running, stop it with ctrl+c", facade.descriptor().name());

    match output {
        Some(mut output) => loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    supervisor.stop().await?;
                    break;
                }
                line = output.next_line() => match line? {
                    Some(line) => println!("{line}"),
                    None => {
                        // stdout closed, the daemon is gone
                        supervisor.wait().await?;
                        warn!("{} exited", supervisor.name());
                        break;
                    }
                }
            }
        },
        None if stream => return Err(anyhow!("no output stream for {name}")),
        None => loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    supervisor.stop().await?;
                    break;
                }
                _ = tokio::time::sleep(Duration::from_secs(1)) => {
                    if !supervisor.is_running() {
                        warn!("{} exited unexpectedly", supervisor.name());
                        break;
                    }
                }
            }
        },
    }

    Ok(())
}

fn build_logger(args: &Args) -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog::LevelFilter::new(drain, args.log_level()).fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    Logger::root(Arc::new(drain), slog::o!())
}
