use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use serde::Serialize;
use tagwire_exchange::{Dataset, DispatchTable, ExchangeServer, ServerConfig};
use tracing::info;

use crate::cmd::{parse_duration, ServeArgs};
use crate::dataset;
use crate::exit::{exchange_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct ListeningOutput<'a> {
    event: &'static str,
    endpoint: &'a str,
    records: usize,
}

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let poll_interval = parse_duration(&args.poll_interval)?;
    let records = dataset::resolve(&args.data)?;
    let record_count = records.len();

    let dataset =
        Dataset::new(records).map_err(|err| exchange_error("dataset encode failed", err))?;
    let table = DispatchTable::standard(dataset)
        .map_err(|err| exchange_error("dispatch setup failed", err))?;

    let config = ServerConfig::new(args.endpoint).with_poll_interval(poll_interval);
    let mut server = ExchangeServer::new(config, table);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let endpoint = server
        .start()
        .map_err(|err| exchange_error("start failed", err))?
        .to_string();
    print_listening(&endpoint, record_count, format);

    while running.load(Ordering::SeqCst) {
        thread::sleep(poll_interval);
    }

    info!("interrupt received");
    server
        .stop()
        .map_err(|err| exchange_error("shutdown failed", err))?;
    Ok(SUCCESS)
}

fn print_listening(endpoint: &str, records: usize, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ListeningOutput {
                event: "listening",
                endpoint,
                records,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("listening on {endpoint} ({records} records)");
        }
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
