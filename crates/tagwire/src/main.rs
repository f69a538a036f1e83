mod cmd;
mod dataset;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "tagwire", version, about = "Tagged request/reply messaging CLI")]
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
    use tagwire_proto::RequestKind;

    use super::*;

    #[test]
    fn parses_call_subcommand() {
        let cli = Cli::try_parse_from([
            "tagwire",
            "call",
            "get-large-payload-multipart",
            "--endpoint",
            "ipc:///tmp/test.sock",
        ])
        .expect("call args should parse");

        let Command::Call(args) = cli.command else {
            panic!("expected call subcommand");
        };
        assert_eq!(args.kind, RequestKind::GetLargePayloadMultipart);
        assert_eq!(args.endpoint.to_string(), "ipc:///tmp/test.sock");
    }

    #[test]
    fn rejects_unknown_kind() {
        let err = Cli::try_parse_from(["tagwire", "call", "get-everything"])
            .expect_err("unknown kind should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn rejects_conflicting_dataset_args() {
        let err = Cli::try_parse_from([
            "tagwire",
            "serve",
            "--records",
            "10",
            "--dataset",
            "/tmp/landings.json",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn serve_defaults_to_wildcard_bind() {
        let cli = Cli::try_parse_from(["tagwire", "serve"]).expect("serve args should parse");
        let Command::Serve(args) = cli.command else {
            panic!("expected serve subcommand");
        };
        assert_eq!(args.endpoint.to_string(), "tcp://*:5555");
        assert_eq!(args.poll_interval, "10ms");
    }

    #[test]
    fn parses_bench_kinds() {
        let cli = Cli::try_parse_from([
            "tagwire",
            "bench",
            "--iterations",
            "5",
            "--kinds",
            "get-small-payload,post-large-payload",
        ])
        .expect("bench args should parse");
        let Command::Bench(args) = cli.command else {
            panic!("expected bench subcommand");
        };
        assert_eq!(args.iterations, 5);
        assert_eq!(
            args.kinds,
            Some(vec![
                RequestKind::GetSmallPayload,
                RequestKind::PostLargePayload
            ])
        );
    }
}
