//! Terminal client that holds one WebSocket conversation at a time: the
//! operator sends a message, waits for the reply, and only then sends again.

pub mod cancel;
pub mod cli;
pub mod client;
pub mod config;
pub mod connection;
pub mod console;
pub mod error;
pub mod gate;
pub mod input;

pub use cancel::{CancellationSignal, StopReason};
pub use client::Session;
pub use config::Config;
pub use connection::{dial, Connection, Transport};
pub use console::{Console, Notice, StdoutConsole};
pub use error::{SetupError, TransportError};
