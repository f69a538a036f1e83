use std::time::Duration;

use tagwire_frame::FrameConfig;
use tagwire_transport::{Endpoint, DEFAULT_BIND_ENDPOINT, DEFAULT_CONNECT_ENDPOINT};

/// How often the server loop wakes up to check for shutdown.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Longest the server spends delivering one reply to a peer that is not reading.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Reply server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind. Defaults to `tcp://*:5555`.
    pub endpoint: Endpoint,
    /// Receive timeout per loop iteration. Replies are also written in
    /// slices of this length so shutdown is noticed mid-write.
    pub poll_interval: Duration,
    /// Upper bound on writing one reply; the connection is dropped after it.
    pub reply_timeout: Duration,
    /// Limits applied to every connection. `write_timeout` is replaced by
    /// the poll interval.
    pub frame: FrameConfig,
}

impl ServerConfig {
    /// Default configuration bound to `endpoint`.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            ..Self::default()
        }
    }

    /// Override the poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Override the reply timeout.
    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(DEFAULT_BIND_ENDPOINT),
            poll_interval: DEFAULT_POLL_INTERVAL,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            frame: FrameConfig::default(),
        }
    }
}

/// Request client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Address to connect to. Defaults to `tcp://localhost:5555`.
    pub endpoint: Endpoint,
    /// Upper bound on waiting for a reply. `None` blocks indefinitely.
    pub request_timeout: Option<Duration>,
    /// Limits applied to the connection.
    pub frame: FrameConfig,
}

impl ClientConfig {
    /// Default configuration connecting to `endpoint`.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            ..Self::default()
        }
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(DEFAULT_CONNECT_ENDPOINT),
            request_timeout: None,
            frame: FrameConfig::default(),
        }
    }
}

fn default_endpoint(raw: &str) -> Endpoint {
    // Both defaults are compile-time constants that parse.
    raw.parse().unwrap_or(Endpoint::Tcp {
        host: "localhost".to_string(),
        port: 5555,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_wire_conventions() {
        let server = ServerConfig::default();
        assert_eq!(server.endpoint.to_string(), "tcp://*:5555");
        assert_eq!(server.poll_interval, Duration::from_millis(10));
        assert_eq!(server.reply_timeout, Duration::from_secs(5));

        let client = ClientConfig::default();
        assert_eq!(client.endpoint.to_string(), "tcp://localhost:5555");
        assert!(client.request_timeout.is_none());
    }

    #[test]
    fn builders_override_fields() {
        let endpoint: Endpoint = "ipc:///tmp/tagwire-config.sock".parse().unwrap();
        let client = ClientConfig::new(endpoint.clone()).with_request_timeout(Duration::from_secs(2));
        assert_eq!(client.endpoint, endpoint);
        assert_eq!(client.request_timeout, Some(Duration::from_secs(2)));

        let server = ServerConfig::new(endpoint)
            .with_poll_interval(Duration::from_millis(50))
            .with_reply_timeout(Duration::from_millis(300));
        assert_eq!(server.poll_interval, Duration::from_millis(50));
        assert_eq!(server.reply_timeout, Duration::from_millis(300));
    }
}
