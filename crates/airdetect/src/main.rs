mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "airdetect",
    version,
    about = "Air-quality sensor telemetry receiver"
)]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_listen_defaults() {
        let cli = Cli::try_parse_from(["airdetect", "listen"]).expect("listen args should parse");
        let Command::Listen(args) = cli.command else {
            panic!("expected listen");
        };
        assert_eq!(args.device.idle_timeout, "5m");
        assert!(args.count.is_none());
    }

    #[test]
    fn parses_serve_flags() {
        let cli = Cli::try_parse_from([
            "airdetect",
            "--format",
            "json",
            "serve",
            "--addr",
            "127.0.0.1:9001",
            "--metrics-addr",
            "127.0.0.1:9101",
            "--prefix",
            "",
            "--quiet",
        ])
        .expect("serve args should parse");

        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.device.addr, "127.0.0.1:9001");
        assert_eq!(args.metrics_addr, "127.0.0.1:9101");
        assert_eq!(args.prefix, "");
        assert!(args.quiet);
    }

    #[test]
    fn decode_requires_hex() {
        let err = Cli::try_parse_from(["airdetect", "decode"]).expect_err("missing hex should fail");
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }
}
