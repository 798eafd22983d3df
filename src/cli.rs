//! Command-line surface for the `ws-chat` binary.

use std::time::Duration;

use clap::Parser;

use crate::config::Config;

/// Chat with a WebSocket server from the terminal, one message per reply.
#[derive(Debug, Parser)]
#[command(name = "ws-chat", version, about, long_about = None)]
pub struct Cli {
    /// WebSocket server endpoint URL.
    #[arg(short, long, value_parser = parse_endpoint)]
    pub endpoint: String,

    /// Handshake headers (key=value, repeatable or comma-separated).
    #[arg(short = 'H', long = "headers", value_parser = parse_header, value_delimiter = ',')]
    pub headers: Vec<(String, String)>,

    /// How long to wait for the close handshake on shutdown.
    #[arg(long, default_value_t = 1000)]
    pub close_timeout_ms: u64,

    /// Suppress log output except errors.
    #[arg(short, long)]
    pub quiet: bool,

    /// Log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn config(&self) -> Config {
        Config {
            endpoint: self.endpoint.clone(),
            headers: self.headers.clone(),
            close_timeout: Duration::from_millis(self.close_timeout_ms),
            ..Config::default()
        }
    }

    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

fn parse_endpoint(s: &str) -> Result<String, String> {
    let endpoint = s.trim();
    if endpoint.is_empty() {
        return Err("endpoint must not be empty".to_string());
    }
    Ok(endpoint.to_string())
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {s:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("header name missing in {s:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}
