#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use ws_chat::gate::TurnGate;
use ws_chat::{CancellationSignal, Connection, Notice, Session, StopReason, Transport, TransportError};

pub const WAIT: Duration = Duration::from_secs(5);

/// What crossed the fake wire, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wire {
    Sent(String),
    Delivered(String),
}

type Inbound = Result<String, TransportError>;
type Responder = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// In-memory peer. Replies are produced by a responder as soon as a message
/// is sent; tests can also push inbound frames or failures directly.
pub struct ScriptedPeer {
    log: Arc<Mutex<Vec<Wire>>>,
    closes: Arc<AtomicUsize>,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    inbound_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Inbound>>,
    responder: Responder,
    send_error: Option<TransportError>,
}

#[derive(Clone)]
pub struct PeerHandle {
    log: Arc<Mutex<Vec<Wire>>>,
    closes: Arc<AtomicUsize>,
    inbound: mpsc::UnboundedSender<Inbound>,
}

impl ScriptedPeer {
    pub fn replying(responder: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> (Self, PeerHandle) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let peer = Self {
            log: Arc::default(),
            closes: Arc::default(),
            inbound_tx,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            responder: Box::new(responder),
            send_error: None,
        };
        let handle = PeerHandle {
            log: peer.log.clone(),
            closes: peer.closes.clone(),
            inbound: peer.inbound_tx.clone(),
        };
        (peer, handle)
    }

    pub fn echo() -> (Self, PeerHandle) {
        Self::replying(|text| Some(format!("re: {text}")))
    }

    /// Never replies on its own; receive blocks until closed.
    pub fn silent() -> (Self, PeerHandle) {
        Self::replying(|_| None)
    }

    pub fn failing_sends(mut self, error: TransportError) -> Self {
        self.send_error = Some(error);
        self
    }
}

#[async_trait]
impl Transport for ScriptedPeer {
    async fn send(&self, text: &str) -> Result<(), TransportError> {
        if let Some(error) = &self.send_error {
            return Err(error.clone());
        }
        self.log.lock().unwrap().push(Wire::Sent(text.to_owned()));
        if let Some(reply) = (self.responder)(text) {
            let _ = self.inbound_tx.send(Ok(reply));
        }
        Ok(())
    }

    async fn receive(&self) -> Result<String, TransportError> {
        let mut inbound = self.inbound_rx.lock().await;
        match inbound.recv().await {
            Some(Ok(text)) => {
                self.log.lock().unwrap().push(Wire::Delivered(text.clone()));
                Ok(text)
            }
            Some(Err(e)) => Err(e),
            None => std::future::pending().await,
        }
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

impl PeerHandle {
    pub fn log(&self) -> Vec<Wire> {
        self.log.lock().unwrap().clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn push(&self, inbound: Inbound) {
        self.inbound.send(inbound).unwrap();
    }

    pub async fn wait_for_sends(&self, count: usize) {
        timeout(WAIT, async {
            loop {
                let sent = self
                    .log()
                    .iter()
                    .filter(|w| matches!(w, Wire::Sent(_)))
                    .count();
                if sent >= count {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("peer never saw the expected sends");
    }
}

pub struct Running {
    pub task: JoinHandle<StopReason>,
    pub input: mpsc::Sender<String>,
    pub notices: mpsc::UnboundedReceiver<Notice>,
    pub signal: CancellationSignal,
    pub gate: Arc<TurnGate>,
}

pub fn start(peer: ScriptedPeer) -> Running {
    let (notice_tx, notices) = mpsc::unbounded_channel();
    let (input, input_rx) = mpsc::channel(1024);
    let session = Session::new(Connection::new(peer), Arc::new(notice_tx));
    let signal = session.signal();
    let gate = session.gate();
    let task = tokio::spawn(session.run(input_rx));
    Running {
        task,
        input,
        notices,
        signal,
        gate,
    }
}

impl Running {
    pub async fn type_line(&self, line: &str) {
        self.input.send(line.to_owned()).await.unwrap();
    }

    /// Read notices until one matches, returning everything read.
    pub async fn until(&mut self, pred: impl Fn(&Notice) -> bool) -> Vec<Notice> {
        let mut seen = Vec::new();
        timeout(WAIT, async {
            while let Some(notice) = self.notices.recv().await {
                let hit = pred(&notice);
                seen.push(notice);
                if hit {
                    return;
                }
            }
            panic!("console closed before the expected notice; saw {seen:?}");
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for notice"));
        seen
    }

    /// Wait for the session to end and drain whatever it printed.
    pub async fn finish(mut self) -> (StopReason, Vec<Notice>) {
        let reason = timeout(WAIT, self.task)
            .await
            .expect("session did not stop")
            .expect("session task panicked");
        let mut rest = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            rest.push(notice);
        }
        (reason, rest)
    }
}
