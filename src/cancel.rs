//! One-shot shutdown flag shared by every activity of a session.
//!
//! The first caller of [`CancellationSignal::cancel`] records why the session
//! stopped; later calls only observe. The flag never resets.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, info, warn};

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Operator typed `exit`.
    Exit,
    /// Operator input reached end of file.
    InputClosed,
    /// Ctrl-C.
    Interrupted,
    /// Remote closed the connection normally.
    RemoteClosed,
    /// An I/O error ended the conversation.
    Failed(String),
}

impl StopReason {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exit => write!(f, "you asked to exit"),
            Self::InputClosed => write!(f, "input closed"),
            Self::Interrupted => write!(f, "interrupted"),
            Self::RemoteClosed => write!(f, "connection closed by remote"),
            Self::Failed(err) => write!(f, "an error occurred: {err}"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<StopReason>>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise cancellation. Returns `true` only for the call that actually
    /// flipped the signal; its reason is the one that sticks.
    pub fn cancel(&self, reason: StopReason) -> bool {
        let first = self.reason.set(reason.clone()).is_ok();
        self.token.cancel();
        if first {
            debug!(%reason, "cancellation raised");
        }
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal fires. Cancel-safe, meant for `select!`.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    pub fn reason(&self) -> Option<StopReason> {
        self.reason.get().cloned()
    }
}

/// Raise [`StopReason::Interrupted`] on Ctrl-C instead of letting the process
/// die mid-conversation.
pub fn cancel_on_interrupt(signal: CancellationSignal) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = signal.cancelled() => {}
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    info!("interrupt received");
                    signal.cancel(StopReason::Interrupted);
                }
                Err(e) => warn!(error = %e, "unable to listen for interrupt"),
            },
        }
    })
}
