use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use tagwire_proto::RequestKind;
use tagwire_transport::Endpoint;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod bench;
pub mod call;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve a record dataset until interrupted.
    Serve(ServeArgs),
    /// Perform one request/reply exchange and print the decoded result.
    Call(CallArgs),
    /// Time every request kind against a running server.
    Bench(BenchArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Call(args) => call::run(args, format),
        Command::Bench(args) => bench::run(args, format),
        Command::Version(args) => version::run(args, format),
    }
}

/// Where records come from: a synthetic sample or a JSON file.
#[derive(Args, Debug)]
pub struct DatasetArgs {
    /// Number of synthetic records to generate.
    #[arg(long, default_value = "1000", conflicts_with = "dataset")]
    pub records: usize,
    /// JSON file with records (an array, or an object with `meteorite_landings`).
    #[arg(long, value_name = "FILE", env = "TAGWIRE_DATASET")]
    pub dataset: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Endpoint to bind (tcp://host:port, tcp://*:port, ipc:///path).
    #[arg(long, env = "TAGWIRE_ENDPOINT", default_value = tagwire_transport::DEFAULT_BIND_ENDPOINT)]
    pub endpoint: Endpoint,
    /// Receive poll interval; bounds shutdown latency (e.g. 10ms).
    #[arg(long, default_value = "10ms")]
    pub poll_interval: String,
    #[command(flatten)]
    pub data: DatasetArgs,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Request kind (e.g. get-small-payload, post-large-payload-multipart).
    pub kind: RequestKind,
    /// Endpoint to connect to.
    #[arg(long, env = "TAGWIRE_ENDPOINT", default_value = tagwire_transport::DEFAULT_CONNECT_ENDPOINT)]
    pub endpoint: Endpoint,
    /// Maximum time to wait for the reply (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// Records uploaded by post kinds.
    #[command(flatten)]
    pub data: DatasetArgs,
}

#[derive(Args, Debug)]
pub struct BenchArgs {
    /// Endpoint to connect to.
    #[arg(long, env = "TAGWIRE_ENDPOINT", default_value = tagwire_transport::DEFAULT_CONNECT_ENDPOINT)]
    pub endpoint: Endpoint,
    /// Timed exchanges per request kind.
    #[arg(long, default_value = "100")]
    pub iterations: usize,
    /// Request kinds to run (comma-separated). Default: all.
    #[arg(long, value_delimiter = ',')]
    pub kinds: Option<Vec<RequestKind>>,
    /// Maximum time to wait for each reply (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// Records uploaded by post kinds.
    #[command(flatten)]
    pub data: DatasetArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `500ms`, `5s` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_units() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration(" 2 ").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn rejects_bad_durations() {
        for input in ["", "0s", "fast", "-1ms", "1.5s"] {
            let err = parse_duration(input).expect_err("duration should be rejected");
            assert_eq!(err.code, USAGE, "{input}");
        }
    }
}
