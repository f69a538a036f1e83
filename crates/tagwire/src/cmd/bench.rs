use std::time::{Duration, Instant};

use bytes::Bytes;
use tagwire_exchange::{ClientConfig, ExchangeClient, Reply};
use tagwire_proto::{serialize_each, serialize_list, Envelope, MeteoriteLanding, RequestKind};
use tracing::{debug, info, warn};

use crate::cmd::call::perform;
use crate::cmd::{parse_duration, BenchArgs};
use crate::dataset;
use crate::exit::{exchange_error, proto_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_bench, BenchRow, CallResult, OutputFormat};

pub fn run(args: BenchArgs, format: OutputFormat) -> CliResult<i32> {
    if args.iterations == 0 {
        return Err(CliError::new(USAGE, "--iterations must be greater than zero"));
    }
    let timeout = parse_duration(&args.timeout)?;
    let kinds = args.kinds.clone().unwrap_or_else(|| RequestKind::ALL.to_vec());
    let upload = dataset::resolve(&args.data)?;

    let endpoint = args.endpoint.to_string();
    let config = ClientConfig::new(args.endpoint).with_request_timeout(timeout);
    let mut client =
        ExchangeClient::connect(config).map_err(|err| exchange_error("connect failed", err))?;

    let mut rows = Vec::with_capacity(kinds.len());
    for kind in kinds {
        info!(kind = %kind, iterations = args.iterations, "benchmarking");
        rows.push(bench_kind(&mut client, kind, &upload, args.iterations)?);
    }

    print_bench(&endpoint, &rows, format);
    client.close();
    Ok(SUCCESS)
}

fn bench_kind(
    client: &mut ExchangeClient,
    kind: RequestKind,
    upload: &[MeteoriteLanding],
    iterations: usize,
) -> CliResult<BenchRow> {
    let request = request_for(kind, upload)?;
    let request_bytes = payload_len(request.payload());

    // Warm-up exchange; also measures the reply size.
    let reply_bytes = match client
        .call(request)
        .map_err(|err| exchange_error("warm-up failed", err))?
    {
        Reply::Accepted(envelope) => payload_len(envelope.payload()),
        Reply::Rejected(violation) => {
            warn!(kind = %kind, %violation, "warm-up reply rejected");
            0
        }
    };

    let mut samples: Vec<Duration> = Vec::with_capacity(iterations);
    let mut records = 0usize;
    for iteration in 0..iterations {
        let started = Instant::now();
        let result = perform(client, kind, upload)
            .map_err(|err| exchange_error(&format!("{kind} iteration {iteration}"), err))?;
        samples.push(started.elapsed());
        records = match result {
            CallResult::Records(list) => list.len(),
            _ if kind.is_post() => upload.len(),
            _ => 0,
        };
    }
    debug!(kind = %kind, samples = samples.len(), "kind complete");

    Ok(BenchRow::from_samples(
        kind,
        &samples,
        request_bytes,
        reply_bytes,
        records,
    ))
}

fn request_for(kind: RequestKind, upload: &[MeteoriteLanding]) -> CliResult<Envelope> {
    let envelope = Envelope::new(kind);
    Ok(match kind {
        RequestKind::PostLargePayload => envelope.with_payload(
            serialize_list(upload).map_err(|err| proto_error("encode failed", err))?,
        ),
        RequestKind::PostLargePayloadMultipart => envelope.with_payloads(
            serialize_each(upload).map_err(|err| proto_error("encode failed", err))?,
        ),
        _ => envelope,
    })
}

fn payload_len(frames: &[Bytes]) -> usize {
    frames.iter().map(Bytes::len).sum()
}
