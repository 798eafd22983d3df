//! Single-slot permission to send.
//!
//! The gate is a capacity-1 channel of unit tokens. Holding a [`Turn`] is the
//! only way to transmit; after a send the turn is dropped without being put
//! back, so the next one only appears when a reply has been seen.

use tokio::sync::{mpsc, Mutex};

/// Permission to transmit exactly one message. Dropping it consumes it.
#[must_use = "a turn is consumed when dropped"]
#[derive(Debug)]
pub struct Turn(());

#[derive(Debug)]
pub struct TurnGate {
    tx: mpsc::Sender<()>,
    rx: Mutex<mpsc::Receiver<()>>,
}

impl TurnGate {
    /// Gate with its one token already in place, so the operator can send
    /// the first message unprompted.
    pub fn open() -> Self {
        let gate = Self::closed();
        gate.release();
        gate
    }

    pub fn closed() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Wait for the token. Cancel-safe: dropping the future never loses it,
    /// so callers race this against cancellation in `select!`.
    pub async fn acquire(&self) -> Turn {
        let mut rx = self.rx.lock().await;
        // `self.tx` keeps the channel open, so `recv` never yields `None`.
        let _token = rx.recv().await;
        Turn(())
    }

    /// Put the token back. A no-op when the slot is already full.
    pub fn release(&self) {
        if self.tx.try_send(()).is_err() {
            tracing::trace!("turn gate already holds its token");
        }
    }

    /// Number of tokens currently in the slot: 0 or 1.
    pub fn available(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}
