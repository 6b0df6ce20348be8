use std::future::Future;
use std::io;
use std::time::Duration;

use airdetect_device::ConnectionConfig;
use clap::{Args, Subcommand};
use tracing::{info, warn};

use crate::exit::{CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod listen;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Accept sensor connections and print readings as they arrive.
    Listen(ListenArgs),
    /// Accept sensor connections and export the latest readings on /metrics.
    Serve(ServeArgs),
    /// Decode a single hex-encoded frame.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Serve(args) => serve::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DeviceArgs {
    /// Address sensors connect to.
    #[arg(long, env = "AIRDETECT_ADDR", default_value = "0.0.0.0:9000")]
    pub addr: String,
    /// Close a connection after this long without a frame (e.g. 5m, 30s, 500ms).
    #[arg(long, default_value = "5m")]
    pub idle_timeout: String,
}

impl DeviceArgs {
    pub fn connection_config(&self) -> CliResult<ConnectionConfig> {
        Ok(ConnectionConfig {
            idle_timeout: parse_duration(&self.idle_timeout)?,
            ..ConnectionConfig::default()
        })
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Exit after printing N readings.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Address of the Prometheus scrape endpoint.
    #[arg(long, env = "AIRDETECT_METRICS_ADDR", default_value = "0.0.0.0:9100")]
    pub metrics_addr: String,
    /// Metric name prefix; empty for bare names.
    #[arg(long, env = "AIRDETECT_METRIC_PREFIX", default_value = airdetect::metrics::DEFAULT_PREFIX)]
    pub prefix: String,
    /// Do not print readings to stdout.
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame bytes as hex (whitespace and colons are ignored).
    pub hex: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("runtime setup failed: {err}")))
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
pub(crate) async fn shutdown_signal() {
    wait_for_signal(tokio::signal::ctrl_c()).await
}

async fn wait_for_signal(signal: impl Future<Output = io::Result<()>>) {
    match signal.await {
        Ok(()) => info!("interrupted; shutting down"),
        Err(err) => {
            warn!(error = %err, "cannot listen for Ctrl-C; running until killed");
            std::future::pending::<()>().await
        }
    }
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else if let Some(num) = input.strip_suffix('m') {
        (num, "m")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Ok(Duration::from_secs(value.saturating_mul(60))),
    }
}
