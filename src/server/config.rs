//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

/// Default port of the HTTP writer
pub const DEFAULT_WRITER_PORT: u16 = 5500;

/// Default port of the subscriber listener
pub const DEFAULT_SUBSCRIBER_PORT: u16 = 5501;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address of the line-protocol subscriber listener
    pub subscriber_addr: SocketAddr,

    /// Address of the HTTP writer
    pub writer_addr: SocketAddr,

    /// Maximum concurrent subscriber connections (0 = unlimited)
    pub max_connections: usize,

    /// Enable TCP_NODELAY on subscriber sockets
    pub tcp_nodelay: bool,

    /// Longest accepted command line in bytes
    pub max_line_length: usize,

    /// Time allowed for one write to a subscriber before the session is
    /// closed
    pub write_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            subscriber_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_SUBSCRIBER_PORT)),
            writer_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_WRITER_PORT)),
            max_connections: 0, // Unlimited
            tcp_nodelay: true,
            max_line_length: 64 * 1024,
            write_timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    /// Create a config with custom addresses
    pub fn with_addrs(subscriber_addr: SocketAddr, writer_addr: SocketAddr) -> Self {
        Self {
            subscriber_addr,
            writer_addr,
            ..Default::default()
        }
    }

    /// Set the subscriber listener address
    pub fn subscriber_addr(mut self, addr: SocketAddr) -> Self {
        self.subscriber_addr = addr;
        self
    }

    /// Set the HTTP writer address
    pub fn writer_addr(mut self, addr: SocketAddr) -> Self {
        self.writer_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Enable or disable TCP_NODELAY on subscriber sockets
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }

    /// Set the maximum command line length (at least 1)
    pub fn max_line_length(mut self, len: usize) -> Self {
        self.max_line_length = len.max(1);
        self
    }

    /// Set the write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.subscriber_addr.port(), DEFAULT_SUBSCRIBER_PORT);
        assert_eq!(config.writer_addr.port(), DEFAULT_WRITER_PORT);
        assert_eq!(config.max_connections, 0);
        assert!(config.tcp_nodelay);
        assert_eq!(config.max_line_length, 64 * 1024);
    }

    #[test]
    fn test_with_addrs() {
        let sub: SocketAddr = "0.0.0.0:7001".parse().unwrap();
        let writer: SocketAddr = "0.0.0.0:7000".parse().unwrap();
        let config = ServerConfig::with_addrs(sub, writer);

        assert_eq!(config.subscriber_addr, sub);
        assert_eq!(config.writer_addr, writer);
    }

    #[test]
    fn test_builder_max_line_length_clamped() {
        let config = ServerConfig::default().max_line_length(0);

        assert_eq!(config.max_line_length, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let sub: SocketAddr = "127.0.0.1:9001".parse().unwrap();
        let writer: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let config = ServerConfig::default()
            .subscriber_addr(sub)
            .writer_addr(writer)
            .max_connections(50)
            .max_line_length(128)
            .tcp_nodelay(false)
            .write_timeout(Duration::from_secs(2));

        assert_eq!(config.subscriber_addr, sub);
        assert_eq!(config.writer_addr, writer);
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.max_line_length, 128);
        assert!(!config.tcp_nodelay);
        assert_eq!(config.write_timeout, Duration::from_secs(2));
    }
}
