//! Half-duplex conversation over one connection.
//!
//! Three activities share the connection:
//!
//! - the sender waits for operator lines and for a turn, then transmits;
//! - the receiver prints each reply and asks for a re-prompt;
//! - the prompter re-prints the prompt and hands the turn back.
//!
//! They coordinate only through the [`TurnGate`], the prompt channel and the
//! [`CancellationSignal`]. A fourth task waits on the signal and closes the
//! connection, which is what unblocks a receiver parked on a silent peer.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, info_span, Instrument};

use crate::cancel::{CancellationSignal, StopReason};
use crate::connection::Connection;
use crate::console::{Console, Notice};
use crate::gate::TurnGate;

pub const EXIT_COMMAND: &str = "exit";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Exit,
    Send(String),
}

impl Command {
    fn parse(line: &str) -> Self {
        let text = line.trim();
        if text == EXIT_COMMAND {
            Self::Exit
        } else {
            Self::Send(text.to_owned())
        }
    }
}

pub struct Session {
    conn: Arc<Connection>,
    signal: CancellationSignal,
    gate: Arc<TurnGate>,
    console: Arc<dyn Console>,
}

impl Session {
    pub fn new(conn: Connection, console: Arc<dyn Console>) -> Self {
        Self {
            conn: Arc::new(conn),
            signal: CancellationSignal::new(),
            gate: Arc::new(TurnGate::open()),
            console,
        }
    }

    /// Use an externally owned signal, e.g. one already wired to Ctrl-C.
    pub fn with_signal(mut self, signal: CancellationSignal) -> Self {
        self.signal = signal;
        self
    }

    pub fn signal(&self) -> CancellationSignal {
        self.signal.clone()
    }

    pub fn gate(&self) -> Arc<TurnGate> {
        self.gate.clone()
    }

    /// Run the conversation until cancellation, then join every activity and
    /// report why it stopped. `input` carries raw operator lines.
    pub async fn run(self, input: mpsc::Receiver<String>) -> StopReason {
        let Self {
            conn,
            signal,
            gate,
            console,
        } = self;

        console.show(Notice::Connected);
        console.show(Notice::Prompt);

        let closer = tokio::spawn(
            close_on_cancel(conn.clone(), signal.clone()).instrument(info_span!("closer")),
        );
        let (prompt_tx, prompt_rx) = mpsc::unbounded_channel();

        let sender = tokio::spawn(
            sender_loop(
                conn.clone(),
                gate.clone(),
                input,
                signal.clone(),
                console.clone(),
            )
            .instrument(info_span!("sender")),
        );
        let receiver = tokio::spawn(
            receiver_loop(conn, prompt_tx, signal.clone(), console.clone())
                .instrument(info_span!("receiver")),
        );
        let prompter = tokio::spawn(
            prompter_loop(prompt_rx, gate, signal.clone(), console.clone())
                .instrument(info_span!("prompter")),
        );

        let (sender, receiver, prompter) = tokio::join!(sender, receiver, prompter);
        for (activity, joined) in [("sender", sender), ("receiver", receiver), ("prompter", prompter)] {
            if let Err(e) = joined {
                error!(activity, error = %e, "activity ended abnormally");
                signal.cancel(StopReason::Failed(format!("{activity} task failed: {e}")));
            }
        }

        // Loops only return after cancellation; this is a no-op unless one panicked.
        signal.cancel(StopReason::Failed("session ended without a stop reason".into()));
        if let Err(e) = closer.await {
            error!(error = %e, "closer task ended abnormally");
        }

        let reason = signal
            .reason()
            .unwrap_or_else(|| StopReason::Failed("session ended without a stop reason".into()));
        info!(%reason, "session finished");
        console.show(Notice::Finished(reason.clone()));
        reason
    }
}

async fn close_on_cancel(conn: Arc<Connection>, signal: CancellationSignal) {
    signal.cancelled().await;
    if conn.close().await {
        info!(reason = ?signal.reason(), "connection closed");
    }
}

async fn sender_loop(
    conn: Arc<Connection>,
    gate: Arc<TurnGate>,
    mut input: mpsc::Receiver<String>,
    signal: CancellationSignal,
    console: Arc<dyn Console>,
) {
    let mut typed_ahead: VecDeque<String> = VecDeque::new();
    let mut input_open = true;

    loop {
        tokio::select! {
            biased;
            _ = signal.cancelled() => break,
            // Take a turn only when there is something to do with it. At end of
            // input the turn is still awaited so an outstanding reply is shown.
            turn = gate.acquire(), if !typed_ahead.is_empty() || !input_open => {
                let Some(text) = typed_ahead.pop_front() else {
                    debug!("operator input ended");
                    signal.cancel(StopReason::InputClosed);
                    break;
                };
                if let Err(e) = conn.send(&text).await {
                    if !signal.is_cancelled() {
                        console.show(Notice::SendFailed(e.clone()));
                        signal.cancel(StopReason::Failed(e.to_string()));
                    }
                    break;
                }
                debug!(bytes = text.len(), "message sent");
                // Not returned: the prompter hands out the next turn on reply.
                drop(turn);
            }
            line = input.recv(), if input_open => match line {
                Some(line) => match Command::parse(&line) {
                    Command::Exit => {
                        if !typed_ahead.is_empty() {
                            debug!(discarded = typed_ahead.len(), "exit discards typed-ahead lines");
                        }
                        signal.cancel(StopReason::Exit);
                        break;
                    }
                    Command::Send(text) => typed_ahead.push_back(text),
                },
                None => input_open = false,
            },
        }
    }

    console.show(Notice::SenderStopped);
}

async fn receiver_loop(
    conn: Arc<Connection>,
    prompts: mpsc::UnboundedSender<()>,
    signal: CancellationSignal,
    console: Arc<dyn Console>,
) {
    loop {
        tokio::select! {
            biased;
            _ = signal.cancelled() => break,
            received = conn.receive() => match received {
                Ok(text) => {
                    debug!(bytes = text.len(), "message received");
                    console.show(Notice::Received(text));
                    if prompts.send(()).is_err() {
                        break;
                    }
                }
                Err(_) if signal.is_cancelled() => break,
                Err(e) if e.is_normal_closure() => {
                    console.show(Notice::ConnectionClosed);
                    signal.cancel(StopReason::RemoteClosed);
                    break;
                }
                Err(e) => {
                    console.show(Notice::ReceiveFailed(e.clone()));
                    signal.cancel(StopReason::Failed(e.to_string()));
                    break;
                }
            },
        }
    }

    console.show(Notice::ReceiverStopped);
}

async fn prompter_loop(
    mut prompts: mpsc::UnboundedReceiver<()>,
    gate: Arc<TurnGate>,
    signal: CancellationSignal,
    console: Arc<dyn Console>,
) {
    loop {
        tokio::select! {
            biased;
            _ = signal.cancelled() => break,
            prompt = prompts.recv() => match prompt {
                Some(()) => {
                    gate.release();
                    console.show(Notice::Prompt);
                }
                None => break,
            },
        }
    }
    debug!("prompter stopped");
}
