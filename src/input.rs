//! Operator input on a dedicated thread.
//!
//! A blocking `read_line` cannot be interrupted, and a blocking read parked on
//! the runtime's blocking pool would hold up runtime shutdown. The thread
//! below owns the reader for the life of the process and forwards raw lines
//! over a channel, which the sender can `select!` against cancellation.

use std::io::{self, BufRead};
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Spawn the reader thread. The returned channel closes at end of input, on
/// a read error, or once the receiver is dropped and another line arrives.
pub fn spawn_line_reader<R>(reader: R, capacity: usize) -> io::Result<mpsc::Receiver<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    thread::Builder::new()
        .name("operator-input".into())
        .spawn(move || {
            for line in reader.lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to read operator input");
                        break;
                    }
                }
            }
            debug!("operator input closed");
        })?;
    Ok(rx)
}

pub fn stdin_lines(capacity: usize) -> io::Result<mpsc::Receiver<String>> {
    spawn_line_reader(io::BufReader::new(io::stdin()), capacity)
}
