use std::io::IsTerminal;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, CellAlignment, ContentArrangement, Table};
use serde::Serialize;
use tagwire_proto::{MeteoriteLanding, RequestKind};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Decoded result of one exchange.
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CallResult {
    Text(String),
    Records(Vec<MeteoriteLanding>),
    Status(String),
    Frames(usize),
}

#[derive(Serialize)]
struct CallOutput<'a> {
    kind: &'a str,
    elapsed_us: u64,
    timestamp: String,
    result: &'a CallResult,
}

pub fn print_call(
    kind: RequestKind,
    elapsed: Duration,
    result: &CallResult,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = CallOutput {
                kind: kind.name(),
                elapsed_us: micros(elapsed),
                timestamp: now_unix_seconds(),
                result,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => match result {
            CallResult::Records(records) => println!("{}", records_table(records)),
            other => {
                let mut table = new_table(vec!["KIND", "ELAPSED", "RESULT"]);
                table.add_row(vec![
                    kind.name().to_string(),
                    format_latency(elapsed),
                    summary(other),
                ]);
                println!("{table}");
            }
        },
        OutputFormat::Pretty => {
            println!(
                "kind={} elapsed={} result={}",
                kind,
                format_latency(elapsed),
                summary(result)
            );
        }
    }
}

/// Latency and payload statistics for one request kind.
#[derive(Debug, Clone, Serialize)]
pub struct BenchRow {
    pub kind: &'static str,
    pub iterations: usize,
    pub min_us: u64,
    pub mean_us: u64,
    pub max_us: u64,
    pub request_bytes: usize,
    pub reply_bytes: usize,
    pub records: usize,
}

impl BenchRow {
    pub fn from_samples(
        kind: RequestKind,
        samples: &[Duration],
        request_bytes: usize,
        reply_bytes: usize,
        records: usize,
    ) -> Self {
        let min = samples.iter().min().copied().unwrap_or_default();
        let max = samples.iter().max().copied().unwrap_or_default();
        let total: Duration = samples.iter().sum();
        let mean = match u32::try_from(samples.len()) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(count) => total / count,
        };
        Self {
            kind: kind.name(),
            iterations: samples.len(),
            min_us: micros(min),
            mean_us: micros(mean),
            max_us: micros(max),
            request_bytes,
            reply_bytes,
            records,
        }
    }
}

#[derive(Serialize)]
struct BenchOutput<'a> {
    endpoint: &'a str,
    timestamp: String,
    results: &'a [BenchRow],
}

pub fn print_bench(endpoint: &str, rows: &[BenchRow], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = BenchOutput {
                endpoint,
                timestamp: now_unix_seconds(),
                results: rows,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = new_table(vec![
                "KIND", "N", "MIN", "MEAN", "MAX", "REQ BYTES", "REPLY BYTES", "RECORDS",
            ]);
            for row in rows {
                table.add_row(vec![
                    row.kind.to_string(),
                    row.iterations.to_string(),
                    format_us(row.min_us),
                    format_us(row.mean_us),
                    format_us(row.max_us),
                    row.request_bytes.to_string(),
                    row.reply_bytes.to_string(),
                    row.records.to_string(),
                ]);
            }
            for index in 1..8 {
                if let Some(column) = table.column_mut(index) {
                    column.set_cell_alignment(CellAlignment::Right);
                }
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in rows {
                println!(
                    "{} n={} min={} mean={} max={} req={}B reply={}B records={}",
                    row.kind,
                    row.iterations,
                    format_us(row.min_us),
                    format_us(row.mean_us),
                    format_us(row.max_us),
                    row.request_bytes,
                    row.reply_bytes,
                    row.records
                );
            }
        }
    }
}

fn records_table(records: &[MeteoriteLanding]) -> Table {
    let mut table = new_table(vec![
        "ID", "NAME", "CLASS", "MASS (g)", "FALL", "YEAR", "LAT", "LONG",
    ]);
    for record in records {
        table.add_row(vec![
            record.id.to_string(),
            record.name.clone(),
            record.rec_class.clone(),
            format!("{:.1}", record.mass),
            record.fall.clone(),
            record.year.to_string(),
            format!("{:.5}", record.rec_lat),
            format!("{:.5}", record.rec_long),
        ]);
    }
    table
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn summary(result: &CallResult) -> String {
    match result {
        CallResult::Text(text) if text.is_empty() => "<empty>".to_string(),
        CallResult::Text(text) | CallResult::Status(text) => text.clone(),
        CallResult::Records(records) => format!("{} records", records.len()),
        CallResult::Frames(count) => format!("{count} frame(s)"),
    }
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

fn format_latency(duration: Duration) -> String {
    format_us(micros(duration))
}

fn format_us(us: u64) -> String {
    if us >= 1_000 {
        format!("{:.2}ms", us as f64 / 1_000.0)
    } else {
        format!("{us}µs")
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
