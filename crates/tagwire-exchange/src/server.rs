//! Reply server: one worker thread running the receive/dispatch/reply loop.
//!
//! ```text
//! Idle ──► AwaitRequest ──(frame set)──► Dispatch ──► Reply ──► Idle
//!              │  ▲
//!              └──┘ poll timeout: re-check shutdown flag
//! ```
//!
//! The worker exclusively owns the [`ReplySocket`]. `stop` raises the
//! shutdown flag and joins the worker, so the socket is released before
//! `stop` returns. Replies are written in poll-interval slices, so a peer
//! that stops reading delays shutdown by at most one slice.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tagwire_frame::FrameConfig;
use tagwire_proto::decode_tag;
use tagwire_transport::Endpoint;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::dispatch::DispatchTable;
use crate::error::{ExchangeError, Result};
use crate::socket::ReplySocket;

const WORKER_THREAD_NAME: &str = "tagwire-server";

/// Zero would disable the socket timeouts the loop relies on.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

struct Running {
    endpoint: Endpoint,
    shutdown: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// A request/reply server with an explicit `Stopped`/`Running` lifecycle.
pub struct ExchangeServer {
    config: ServerConfig,
    table: Arc<DispatchTable>,
    running: Option<Running>,
}

impl ExchangeServer {
    /// Create a stopped server.
    pub fn new(config: ServerConfig, table: DispatchTable) -> Self {
        Self {
            config,
            table: Arc::new(table),
            running: None,
        }
    }

    /// Bind and spawn the worker.
    ///
    /// Binding happens on the calling thread, so address errors are
    /// reported here and a successful return means clients can connect.
    pub fn start(&mut self) -> Result<Endpoint> {
        if self.running.is_some() {
            return Err(ExchangeError::AlreadyRunning);
        }
        let frames = self.table.largest_reply();
        if frames > self.config.frame.max_frames {
            return Err(ExchangeError::ReplyTooLarge {
                frames,
                max: self.config.frame.max_frames,
            });
        }

        let poll_interval = self.config.poll_interval.max(MIN_POLL_INTERVAL);
        let frame = FrameConfig {
            write_timeout: Some(poll_interval),
            ..self.config.frame.clone()
        };
        let socket = ReplySocket::bind(&self.config.endpoint, frame)?;
        let endpoint = socket.local_endpoint().clone();
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker = ServerLoop {
            socket,
            table: Arc::clone(&self.table),
            shutdown: Arc::clone(&shutdown),
            poll_interval,
            reply_timeout: self.config.reply_timeout,
        };
        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.into())
            .spawn(move || worker.run())
            .map_err(|err| ExchangeError::Worker(format!("spawn failed: {err}")))?;

        info!(endpoint = %endpoint, "server started");
        self.running = Some(Running {
            endpoint: endpoint.clone(),
            shutdown,
            handle,
        });
        Ok(endpoint)
    }

    /// Signal the worker and wait for it to exit.
    pub fn stop(&mut self) -> Result<()> {
        let running = self.running.take().ok_or(ExchangeError::NotRunning)?;
        info!(endpoint = %running.endpoint, "server shutdown initiated");
        running.shutdown.store(true, Ordering::Relaxed);
        running
            .handle
            .join()
            .map_err(|_| ExchangeError::Worker("server worker panicked".to_string()))?;
        info!("server shutdown complete");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// The bound endpoint while running.
    pub fn local_endpoint(&self) -> Option<&Endpoint> {
        self.running.as_ref().map(|running| &running.endpoint)
    }

    /// The shutdown flag of the running worker, for external signal handling.
    pub fn shutdown_flag(&self) -> Option<Arc<AtomicBool>> {
        self.running
            .as_ref()
            .map(|running| Arc::clone(&running.shutdown))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl Drop for ExchangeServer {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.shutdown.store(true, Ordering::Relaxed);
            if running.handle.join().is_err() {
                error!("server worker panicked during drop");
            }
        }
    }
}

struct ServerLoop {
    socket: ReplySocket,
    table: Arc<DispatchTable>,
    shutdown: Arc<AtomicBool>,
    poll_interval: Duration,
    reply_timeout: Duration,
}

impl ServerLoop {
    fn run(mut self) {
        debug!("server loop started");
        while !self.shutdown.load(Ordering::Relaxed) {
            let request = match self.socket.try_receive(self.poll_interval) {
                Ok(Some(request)) => request,
                Ok(None) => continue,
                Err(err) => {
                    warn!(error = %err, "receive failed; connection dropped");
                    if !err.is_connection_fault() {
                        // Listener-level failure: keep the poll cadence.
                        thread::sleep(self.poll_interval);
                    }
                    continue;
                }
            };

            let kind = decode_tag(request.first());
            debug!(kind = %kind, frames = request.len(), "request received");

            let reply = self.table.dispatch(&request);
            let reply_frames = reply.len();
            let shutdown = &self.shutdown;
            let deadline = Instant::now() + self.reply_timeout;
            let keep_waiting = || !shutdown.load(Ordering::Relaxed) && Instant::now() < deadline;
            match self.socket.try_send_with(&reply, keep_waiting) {
                Ok(()) => debug!(kind = %kind, frames = reply_frames, "reply sent"),
                Err(err) => warn!(kind = %kind, error = %err, "reply not delivered"),
            }
        }
        self.socket.close();
        debug!("server loop exited");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::dispatch::Dataset;

    fn sock_config(tag: &str) -> (ServerConfig, PathBuf) {
        let dir = PathBuf::from(format!(
            "/tmp/tagwire-srv-{}-{}-{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        let config = ServerConfig::new(Endpoint::unix(dir.join("server.sock")));
        (config, dir)
    }

    fn table() -> DispatchTable {
        DispatchTable::standard(Dataset::empty().unwrap()).unwrap()
    }

    #[test]
    fn start_then_stop_releases_socket() {
        let (config, dir) = sock_config("lifecycle");
        let path = dir.join("server.sock");
        let mut server = ExchangeServer::new(config, table());
        assert!(!server.is_running());

        let endpoint = server.start().unwrap();
        assert_eq!(endpoint, Endpoint::unix(&path));
        assert!(server.is_running());
        assert_eq!(server.local_endpoint(), Some(&endpoint));
        assert!(path.exists());

        server.stop().unwrap();
        assert!(!server.is_running());
        assert!(!path.exists());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn double_start_is_rejected() {
        let (config, dir) = sock_config("double");
        let mut server = ExchangeServer::new(config, table());
        server.start().unwrap();
        assert!(matches!(server.start(), Err(ExchangeError::AlreadyRunning)));
        server.stop().unwrap();
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn stop_when_stopped_is_rejected() {
        let (config, dir) = sock_config("stopped");
        let mut server = ExchangeServer::new(config, table());
        assert!(matches!(server.stop(), Err(ExchangeError::NotRunning)));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn restart_after_stop_binds_again() {
        let (config, dir) = sock_config("restart");
        let mut server = ExchangeServer::new(config, table());
        server.start().unwrap();
        server.stop().unwrap();
        server.start().unwrap();
        server.stop().unwrap();
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn shutdown_flag_is_shared_with_worker() {
        let (config, dir) = sock_config("flag");
        let mut server = ExchangeServer::new(config, table());
        assert!(server.shutdown_flag().is_none());
        server.start().unwrap();
        let flag = server.shutdown_flag().unwrap();
        assert!(!flag.load(Ordering::Relaxed));
        server.stop().unwrap();
        assert!(flag.load(Ordering::Relaxed));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn start_rejects_dataset_beyond_frame_limit() {
        let (mut config, dir) = sock_config("too-many");
        config.frame.max_frames = 4;
        let records = (1..=5)
            .map(|id| tagwire_proto::MeteoriteLanding {
                id,
                ..Default::default()
            })
            .collect();
        let table = DispatchTable::standard(Dataset::new(records).unwrap()).unwrap();
        let mut server = ExchangeServer::new(config, table);

        assert!(matches!(
            server.start(),
            Err(ExchangeError::ReplyTooLarge { frames: 6, max: 4 })
        ));
        assert!(!server.is_running());
        assert!(!dir.join("server.sock").exists());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn drop_stops_worker() {
        let (config, dir) = sock_config("drop");
        let path = dir.join("server.sock");
        let mut server = ExchangeServer::new(config, table());
        server.start().unwrap();
        drop(server);
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(dir);
    }
}
