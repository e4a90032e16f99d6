//! Client session configuration.

use std::time::Duration;

use questlink_protocol::DEFAULT_PORT;

/// Total dial attempts before giving up with `ConnectFailed`.
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 5;

/// Pause between two dial attempts.
pub const DEFAULT_CONNECT_DELAY: Duration = Duration::from_secs(5);

/// Bound on a single dial attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a request waits for its reply before resending.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// How many times an unanswered request is resent.
pub const DEFAULT_REQUEST_RETRIES: u32 = 1;

/// Settings for one [`ClientSession`](crate::ClientSession).
///
/// Build one with [`ClientConfig::new`] and override what you need:
///
/// ```rust
/// use std::time::Duration;
/// use questlink_client::ClientConfig;
///
/// let config = ClientConfig::new("192.168.1.20:27093", "Alice")
///     .request_timeout(Duration::from_secs(2))
///     .connect_attempts(3);
/// assert_eq!(config.name, "Alice");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address as `host:port`.
    pub addr: String,

    /// Display name proposed to the server. Must be unique among the
    /// players currently connected.
    pub name: String,

    /// Total dial attempts (at least one is always made).
    pub connect_attempts: u32,

    /// Delay between dial attempts.
    pub connect_delay: Duration,

    /// Bound on each dial attempt; an attempt that runs over counts as a
    /// timeout and is retried.
    pub connect_timeout: Duration,

    /// Wait for a correlated reply before resending.
    pub request_timeout: Duration,

    /// Resends of an unanswered request before `Timeout`.
    pub request_retries: u32,
}

impl ClientConfig {
    /// Creates a config for `name` at `addr` with default timings.
    pub fn new(addr: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn connect_attempts(mut self, attempts: u32) -> Self {
        self.connect_attempts = attempts;
        self
    }

    pub fn connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn request_retries(mut self, retries: u32) -> Self {
        self.request_retries = retries;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            addr: format!("127.0.0.1:{DEFAULT_PORT}"),
            name: "Player".to_string(),
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
            connect_delay: DEFAULT_CONNECT_DELAY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            request_retries: DEFAULT_REQUEST_RETRIES,
        }
    }
}
