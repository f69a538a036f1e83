use std::time::Instant;

use tagwire_exchange::{ClientConfig, ExchangeClient, Reply};
use tagwire_proto::{Envelope, MeteoriteLanding, RequestKind};
use tracing::warn;

use crate::cmd::{parse_duration, CallArgs};
use crate::dataset;
use crate::exit::{exchange_error, CliResult, SUCCESS};
use crate::output::{print_call, CallResult, OutputFormat};

pub fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let upload = if args.kind.is_post() {
        dataset::resolve(&args.data)?
    } else {
        Vec::new()
    };

    let config = ClientConfig::new(args.endpoint).with_request_timeout(timeout);
    let mut client =
        ExchangeClient::connect(config).map_err(|err| exchange_error("connect failed", err))?;

    let started = Instant::now();
    let result = perform(&mut client, args.kind, &upload)
        .map_err(|err| exchange_error("call failed", err))?;
    let elapsed = started.elapsed();

    print_call(args.kind, elapsed, &result, format);
    client.close();
    Ok(SUCCESS)
}

/// Run one typed exchange for `kind`.
pub fn perform(
    client: &mut ExchangeClient,
    kind: RequestKind,
    upload: &[MeteoriteLanding],
) -> tagwire_exchange::Result<CallResult> {
    Ok(match kind {
        RequestKind::GetSmallPayload => CallResult::Text(client.get_small_payload()?),
        RequestKind::GetLargePayload => CallResult::Records(client.get_large_payload()?),
        RequestKind::PostLargePayload => CallResult::Status(client.post_large_payload(upload)?),
        RequestKind::GetLargePayloadMultipart => {
            CallResult::Records(client.get_large_payload_multipart()?)
        }
        RequestKind::PostLargePayloadMultipart => {
            CallResult::Status(client.post_large_payload_multipart(upload)?)
        }
        RequestKind::Unspecified => match client.call(Envelope::new(kind))? {
            Reply::Accepted(envelope) => CallResult::Frames(envelope.frame_count()),
            Reply::Rejected(violation) => {
                warn!(%violation, "unexpected reply to unspecified request");
                CallResult::Frames(0)
            }
        },
    })
}
