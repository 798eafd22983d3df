use std::time::Duration;

/// Everything a session needs before it starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// WebSocket URL, e.g. `ws://127.0.0.1:8080/chat`.
    pub endpoint: String,

    /// Extra handshake headers, in the order given.
    pub headers: Vec<(String, String)>,

    /// Upper bound on the close handshake once the session is cancelled.
    pub close_timeout: Duration,

    /// Operator lines buffered between the stdin thread and the sender.
    pub input_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            headers: Vec::new(),
            close_timeout: Duration::from_millis(1000),
            input_buffer: 32,
        }
    }
}

impl Config {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}
