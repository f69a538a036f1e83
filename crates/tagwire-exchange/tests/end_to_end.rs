#![cfg(unix)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use tagwire_exchange::{
    ClientConfig, Dataset, DispatchTable, ExchangeClient, ExchangeError, ExchangeServer, Reply,
    ReplySocket, RequestSocket, ServerConfig, ShapeViolation,
};
use tagwire_frame::{FrameConfig, FrameSet};
use tagwire_proto::{encode_tag, serialize, Envelope, GeoLocation, MeteoriteLanding, RequestKind};
use tagwire_transport::Endpoint;

struct TempSock {
    dir: PathBuf,
}

impl TempSock {
    fn new(tag: &str) -> Self {
        let dir = PathBuf::from(format!(
            "/tmp/tagwire-e2e-{}-{}-{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        Self { dir }
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::unix(self.dir.join("exchange.sock"))
    }
}

impl Drop for TempSock {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

fn landing(id: u32) -> MeteoriteLanding {
    MeteoriteLanding {
        id,
        name: format!("Aachen {id}"),
        name_type: if id % 5 == 0 { "Relict" } else { "Valid" }.to_string(),
        rec_class: "L5".to_string(),
        mass: 21.0 + f64::from(id) * 0.5,
        fall: "Fell".to_string(),
        year: 1880 + (id % 140) as i32,
        rec_lat: 50.775,
        rec_long: 6.083,
        geo_location: (id % 4 != 0).then(|| GeoLocation {
            kind: "Point".to_string(),
            coordinates: vec![6.083, 50.775],
        }),
    }
}

fn records(n: u32) -> Vec<MeteoriteLanding> {
    (1..=n).map(landing).collect()
}

fn start_server(endpoint: Endpoint, records: Vec<MeteoriteLanding>) -> ExchangeServer {
    let table = DispatchTable::standard(Dataset::new(records).expect("dataset should serialize"))
        .expect("table should build");
    let mut server = ExchangeServer::new(ServerConfig::new(endpoint), table);
    server.start().expect("server should start");
    server
}

fn client(endpoint: Endpoint) -> ExchangeClient {
    let config = ClientConfig::new(endpoint).with_request_timeout(Duration::from_secs(5));
    ExchangeClient::connect(config).expect("client should connect")
}

/// What a [`RogueServer`] does with one request.
enum Answer {
    Reply(FrameSet),
    Silence,
    HangUp,
}

/// Serves requests with an arbitrary reply function; `None` means no reply.
struct RogueServer {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl RogueServer {
    fn start<F>(endpoint: &Endpoint, mut reply: F) -> Self
    where
        F: FnMut(usize, &FrameSet) -> Option<FrameSet> + Send + 'static,
    {
        Self::answering(endpoint, move |seen, request| match reply(seen, request) {
            Some(set) => Answer::Reply(set),
            None => Answer::Silence,
        })
    }

    fn answering<F>(endpoint: &Endpoint, mut answer: F) -> Self
    where
        F: FnMut(usize, &FrameSet) -> Answer + Send + 'static,
    {
        let mut socket =
            ReplySocket::bind(endpoint, FrameConfig::default()).expect("rogue should bind");
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            let mut seen = 0usize;
            while !flag.load(Ordering::Relaxed) {
                let Ok(Some(request)) = socket.try_receive(Duration::from_millis(10)) else {
                    continue;
                };
                match answer(seen, &request) {
                    Answer::Reply(set) => {
                        let _ = socket.try_send(&set);
                    }
                    Answer::Silence => {}
                    Answer::HangUp => socket.disconnect(),
                }
                seen += 1;
            }
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for RogueServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[test]
fn small_payload_returns_api_version() {
    let sock = TempSock::new("small");
    let mut server = start_server(sock.endpoint(), Vec::new());
    let mut client = client(sock.endpoint());

    assert_eq!(client.get_small_payload().unwrap(), "API Version 1.0");

    server.stop().unwrap();
}

#[test]
fn large_payload_returns_every_record_in_order() {
    let sock = TempSock::new("large");
    let dataset = records(250);
    let mut server = start_server(sock.endpoint(), dataset.clone());
    let mut client = client(sock.endpoint());

    assert_eq!(client.get_large_payload().unwrap(), dataset);

    server.stop().unwrap();
}

#[test]
fn multipart_payload_returns_every_record_in_order() {
    let sock = TempSock::new("multi");
    let dataset = records(120);
    let mut server = start_server(sock.endpoint(), dataset.clone());
    let mut client = client(sock.endpoint());

    let received = client.get_large_payload_multipart().unwrap();
    assert_eq!(received.len(), 120);
    assert_eq!(received, dataset);

    server.stop().unwrap();
}

#[test]
fn posts_are_acknowledged() {
    let sock = TempSock::new("post");
    let mut server = start_server(sock.endpoint(), Vec::new());
    let mut client = client(sock.endpoint());
    let upload = records(40);

    assert_eq!(client.post_large_payload(&upload).unwrap(), "SUCCESS");
    assert_eq!(client.post_large_payload_multipart(&upload).unwrap(), "SUCCESS");
    assert_eq!(client.post_large_payload(&[]).unwrap(), "SUCCESS");

    server.stop().unwrap();
}

#[test]
fn one_connection_serves_many_exchanges() {
    let sock = TempSock::new("many");
    let dataset = records(10);
    let mut server = start_server(sock.endpoint(), dataset.clone());
    let mut client = client(sock.endpoint());

    for _ in 0..20 {
        assert_eq!(client.get_small_payload().unwrap(), "API Version 1.0");
        assert_eq!(client.get_large_payload_multipart().unwrap(), dataset);
    }

    server.stop().unwrap();
}

#[test]
fn empty_dataset_multipart_reply_is_rejected_and_empty() {
    let sock = TempSock::new("empty-multi");
    let mut server = start_server(sock.endpoint(), Vec::new());
    let mut client = client(sock.endpoint());

    // The server answers with the tag alone, which fails the >= 2 frame rule.
    let reply = client
        .call(Envelope::new(RequestKind::GetLargePayloadMultipart))
        .unwrap();
    assert!(matches!(
        reply,
        Reply::Rejected(ShapeViolation::FrameCount { actual: 1, .. })
    ));
    assert!(client.get_large_payload_multipart().unwrap().is_empty());

    server.stop().unwrap();
}

#[test]
fn unknown_tag_gets_single_unspecified_frame() {
    let sock = TempSock::new("unknown");
    let mut server = start_server(sock.endpoint(), records(3));
    let mut raw = RequestSocket::connect(&sock.endpoint(), FrameConfig::default()).unwrap();

    for tag in [99i32.to_le_bytes().to_vec(), vec![7u8], Vec::new()] {
        raw.try_send(&FrameSet::new(tag).with("ignored")).unwrap();
        let reply = raw
            .try_receive(Some(Duration::from_secs(5)))
            .unwrap()
            .expect("server should reply");
        assert_eq!(reply.len(), 1);
        assert_eq!(reply.first().as_ref(), &encode_tag(RequestKind::Unspecified));
    }

    // The connection is still usable after unknown requests.
    raw.try_send(&Envelope::new(RequestKind::GetSmallPayload).into_frame_set())
        .unwrap();
    let reply = raw.try_receive(Some(Duration::from_secs(5))).unwrap().unwrap();
    assert_eq!(reply[1].as_ref(), b"API Version 1.0");

    raw.close();
    server.stop().unwrap();
}

#[test]
fn server_survives_client_hangup_mid_session() {
    let sock = TempSock::new("hangup");
    let mut server = start_server(sock.endpoint(), records(5));

    let mut first = client(sock.endpoint());
    assert_eq!(first.get_small_payload().unwrap(), "API Version 1.0");
    first.close();

    let mut second = client(sock.endpoint());
    assert_eq!(second.get_large_payload().unwrap().len(), 5);

    server.stop().unwrap();
}

#[test]
fn tcp_ephemeral_port_roundtrip() {
    let endpoint: Endpoint = "tcp://127.0.0.1:0".parse().unwrap();
    let mut server = start_server(endpoint, records(8));
    let bound = server.local_endpoint().cloned().expect("server should be running");
    assert!(!bound.to_string().ends_with(":0"));

    let mut client = client(bound);
    assert_eq!(client.get_small_payload().unwrap(), "API Version 1.0");
    assert_eq!(client.get_large_payload_multipart().unwrap().len(), 8);

    server.stop().unwrap();
}

#[test]
fn mismatched_tag_yields_empty_defaults() {
    let sock = TempSock::new("rogue-tag");
    let _rogue = RogueServer::start(&sock.endpoint(), |_, _| {
        let status = serialize(&landing(1)).ok()?;
        Some(
            Envelope::new(RequestKind::GetSmallPayload)
                .with_payload(status)
                .into_frame_set(),
        )
    });
    let mut client = client(sock.endpoint());

    assert!(client.get_large_payload().unwrap().is_empty());
    assert!(client.get_large_payload_multipart().unwrap().is_empty());
    assert_eq!(client.post_large_payload(&records(2)).unwrap(), "");

    let reply = client.call(Envelope::new(RequestKind::GetLargePayload)).unwrap();
    assert_eq!(
        reply,
        Reply::Rejected(ShapeViolation::TagMismatch {
            expected: RequestKind::GetLargePayload,
            actual: RequestKind::GetSmallPayload,
        })
    );
}

#[test]
fn wrong_frame_count_yields_empty_defaults() {
    let sock = TempSock::new("rogue-count");
    let _rogue = RogueServer::start(&sock.endpoint(), |_, request| {
        // Echo the tag but add an extra frame.
        Some(FrameSet::new(request.first().clone()).with("a").with("b"))
    });
    let mut client = client(sock.endpoint());

    assert_eq!(client.get_small_payload().unwrap(), "");
    assert!(client.get_large_payload().unwrap().is_empty());
    assert_eq!(client.post_large_payload_multipart(&records(3)).unwrap(), "");
}

#[test]
fn malformed_payload_is_a_hard_error() {
    let sock = TempSock::new("rogue-payload");
    let _rogue = RogueServer::start(&sock.endpoint(), |_, request| {
        Some(FrameSet::new(request.first().clone()).with("\u{1}not msgpack"))
    });
    let mut client = client(sock.endpoint());

    let err = client.get_large_payload().unwrap_err();
    assert!(matches!(err, ExchangeError::Proto(_)));
    // A decode failure does not poison the connection.
    assert!(client.is_connected());
}

#[test]
fn timeout_drops_connection_and_next_call_reconnects() {
    let sock = TempSock::new("timeout");
    let _rogue = RogueServer::start(&sock.endpoint(), |seen, request| {
        (seen > 0).then(|| FrameSet::new(request.first().clone()).with("API Version 1.0"))
    });
    let config =
        ClientConfig::new(sock.endpoint()).with_request_timeout(Duration::from_millis(100));
    let mut client = ExchangeClient::connect(config).unwrap();

    let err = client.get_small_payload().unwrap_err();
    assert!(matches!(err, ExchangeError::Timeout(_)));
    assert!(!client.is_connected());

    assert_eq!(client.get_small_payload().unwrap(), "API Version 1.0");
    assert!(client.is_connected());
}

#[test]
fn connect_without_server_fails() {
    let sock = TempSock::new("absent");
    let err = ExchangeClient::connect(ClientConfig::new(sock.endpoint()))
        .err()
        .expect("connect should fail");
    assert!(matches!(err, ExchangeError::Transport(_)));
}

#[test]
fn hangup_without_reply_yields_empty_defaults() {
    let sock = TempSock::new("rogue-hangup");
    let _rogue = RogueServer::answering(&sock.endpoint(), |_, _| Answer::HangUp);
    let mut client = client(sock.endpoint());

    assert_eq!(client.get_small_payload().unwrap(), "");
    assert!(client.get_large_payload().unwrap().is_empty());
    assert_eq!(client.post_large_payload(&records(2)).unwrap(), "");
    assert!(client.get_large_payload_multipart().unwrap().is_empty());
    assert_eq!(client.post_large_payload_multipart(&records(2)).unwrap(), "");

    // The untyped call still reports the missing reply.
    let err = client
        .call(Envelope::new(RequestKind::GetSmallPayload))
        .unwrap_err();
    assert!(matches!(err, ExchangeError::Disconnected(_)));
    assert!(!client.is_connected());
}

fn stalled_reader(sock: &TempSock) -> RequestSocket {
    let mut raw = RequestSocket::connect(&sock.endpoint(), FrameConfig::default()).unwrap();
    raw.try_send(&Envelope::new(RequestKind::GetLargePayload).into_frame_set())
        .unwrap();
    raw
}

#[test]
fn stop_returns_while_peer_is_not_reading() {
    let sock = TempSock::new("stalled-stop");
    let mut server = start_server(sock.endpoint(), records(30_000));
    let _raw = stalled_reader(&sock);

    // Let the worker fill the socket buffer and block on the reply.
    thread::sleep(Duration::from_millis(300));

    let (done, stopped) = mpsc::channel();
    let stopper = thread::spawn(move || {
        let outcome = server.stop();
        let _ = done.send(outcome.is_ok());
    });
    let outcome = stopped.recv_timeout(Duration::from_secs(3));
    assert_eq!(outcome, Ok(true), "stop() did not return in time");
    stopper.join().unwrap();
}

#[test]
fn stalled_reply_is_abandoned_and_next_client_served() {
    let sock = TempSock::new("stalled-next");
    let table = DispatchTable::standard(Dataset::new(records(30_000)).unwrap()).unwrap();
    let config = ServerConfig::new(sock.endpoint()).with_reply_timeout(Duration::from_millis(200));
    let mut server = ExchangeServer::new(config, table);
    server.start().unwrap();

    let _raw = stalled_reader(&sock);
    thread::sleep(Duration::from_millis(50));

    let started = Instant::now();
    let mut next = client(sock.endpoint());
    assert_eq!(next.get_small_payload().unwrap(), "API Version 1.0");
    assert!(started.elapsed() < Duration::from_secs(5));

    server.stop().unwrap();
}
