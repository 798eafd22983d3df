//! Human-facing terminal output.

use std::fmt;
use std::io::{self, Write};

use tokio::sync::mpsc;

use crate::cancel::StopReason;
use crate::error::TransportError;

pub const PROMPT: &str = "\nEnter message (or 'exit' to quit): ";
pub const RECEIVED_LABEL: &str = "Received from server:";

/// A state change worth telling the operator about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Connected,
    Prompt,
    Received(String),
    SendFailed(TransportError),
    ReceiveFailed(TransportError),
    ConnectionClosed,
    SenderStopped,
    ReceiverStopped,
    Finished(StopReason),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "WebSocket connection established successfully"),
            Self::Prompt => write!(f, "{PROMPT}"),
            Self::Received(text) => write!(f, "{RECEIVED_LABEL} {text}"),
            Self::SendFailed(e) | Self::ReceiveFailed(e) => write!(f, "{e}"),
            Self::ConnectionClosed => write!(f, "connection closed"),
            Self::SenderStopped => write!(f, "Send routine stopped"),
            Self::ReceiverStopped => write!(f, "Receive routine stopped"),
            Self::Finished(reason) => write!(f, "Session ended: {reason}"),
        }
    }
}

pub trait Console: Send + Sync {
    fn show(&self, notice: Notice);
}

/// Writes notices to stdout. The prompt is printed without a trailing
/// newline so the operator types on the same line.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutConsole;

impl Console for StdoutConsole {
    fn show(&self, notice: Notice) {
        let mut out = io::stdout().lock();
        let written = match notice {
            Notice::Prompt => write!(out, "{notice}"),
            _ => writeln!(out, "{notice}"),
        };
        if let Err(e) = written.and_then(|()| out.flush()) {
            tracing::warn!(error = %e, "failed to write to terminal");
        }
    }
}

/// Forwards notices over a channel, dropping them once the receiver is gone.
impl Console for mpsc::UnboundedSender<Notice> {
    fn show(&self, notice: Notice) {
        let _ = self.send(notice);
    }
}
