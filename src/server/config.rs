//! Bridge configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration options for the bridge
///
/// Built once at startup and handed to each component's constructor; core
/// logic never consults globals.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address the HTTP/WebSocket endpoint binds to
    pub bind_addr: SocketAddr,

    /// Shared secret the game client must present as `?token=`.
    /// `None` admits any client (open mode).
    pub auth_token: Option<String>,

    /// Interval between liveness probes to the peer
    pub heartbeat_interval: Duration,

    /// Quiet window for coalescing change notifications
    pub debounce_window: Duration,

    /// Directory receiving media capture files
    pub capture_dir: PathBuf,

    /// Bound on queued capture writes before fragments are dropped
    pub capture_queue: usize,

    /// Bound on queued outbound frames to the peer
    pub send_queue: usize,

    /// Root directory for image asset listing (disabled when unset)
    pub asset_root: Option<PathBuf>,

    /// Hard cap on chat search results
    pub search_limit: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9310".parse().unwrap(),
            auth_token: None, // Open mode
            heartbeat_interval: Duration::from_secs(15),
            debounce_window: Duration::from_millis(500),
            capture_dir: PathBuf::from("captures"),
            capture_queue: 64,
            send_queue: 64,
            asset_root: None,
            search_limit: 20,
        }
    }
}

impl BridgeConfig {
    /// Create a new config with a custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Require this shared secret from connecting clients
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Set the heartbeat interval
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the notification debounce window
    pub fn debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    /// Set the capture output directory
    pub fn capture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.capture_dir = dir.into();
        self
    }

    /// Enable asset listing under this root
    pub fn asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = Some(root.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();

        assert_eq!(config.bind_addr.port(), 9310);
        assert!(config.auth_token.is_none());
        assert_eq!(config.heartbeat_interval, Duration::from_secs(15));
        assert_eq!(config.debounce_window, Duration::from_millis(500));
        assert_eq!(config.capture_queue, 64);
        assert!(config.asset_root.is_none());
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:9311".parse().unwrap();
        let config = BridgeConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 9311);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "0.0.0.0:8080".parse().unwrap();
        let config = BridgeConfig::default()
            .bind(addr)
            .auth_token("sesame")
            .heartbeat_interval(Duration::from_secs(30))
            .debounce_window(Duration::from_millis(250))
            .capture_dir("/tmp/captures")
            .asset_root("/srv/assets");

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.auth_token.as_deref(), Some("sesame"));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.debounce_window, Duration::from_millis(250));
        assert_eq!(config.capture_dir, PathBuf::from("/tmp/captures"));
        assert_eq!(config.asset_root, Some(PathBuf::from("/srv/assets")));
    }
}
