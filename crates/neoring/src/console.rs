//! Line-oriented console transport: stdin in, stdout out.
//!
//! A reader thread turns each non-blank input line into an [`Inbound`] event
//! and hands it over a channel. The listener drains that channel through
//! [`Transport::read_subscription`]. Lines read and end-of-input are tracked
//! so `run` can tell when every line has been dispatched.

use std::io::{BufRead, BufReader, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError};

use neoring_lib::transport::{Inbound, Publisher, Transport, TransportError};

/// Split a console line into an event. Blank lines yield `None`.
///
/// The topic runs up to the first space; the rest (possibly empty) is the payload.
pub fn parse_line(line: &str) -> Option<Inbound> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }
    let line = line.trim_start();
    match line.split_once(' ') {
        Some((topic, payload)) => Some(Inbound::new(topic, payload.as_bytes())),
        None => Some(Inbound::new(line, Vec::new())),
    }
}

/// Progress of the input side, shared with the `run` loop.
#[derive(Debug, Default)]
pub struct ConsoleInput {
    lines: AtomicU64,
    eof: AtomicBool,
}

impl ConsoleInput {
    /// Events read from input so far.
    pub fn lines(&self) -> u64 {
        self.lines.load(Ordering::SeqCst)
    }

    pub fn at_eof(&self) -> bool {
        self.eof.load(Ordering::SeqCst)
    }

    /// Input is exhausted and the listener has handled every line.
    pub fn drained(&self, received: u64) -> bool {
        self.at_eof() && self.lines() == received
    }
}

pub struct ConsoleTransport {
    rx: Receiver<Inbound>,
    subscriptions: Vec<String>,
    connected: bool,
    offline: bool,
}

impl ConsoleTransport {
    /// Start reading `reader` on a background thread.
    ///
    /// An `offline` transport refuses every connect, which drives the runtime
    /// into its fail-stop path.
    pub fn spawn<R: Read + Send + 'static>(
        reader: R,
        offline: bool,
    ) -> std::io::Result<(Self, Arc<ConsoleInput>)> {
        let (tx, rx) = channel::unbounded();
        let input = Arc::new(ConsoleInput::default());
        let progress = Arc::clone(&input);

        std::thread::Builder::new()
            .name("console-reader".into())
            .spawn(move || {
                for line in BufReader::new(reader).lines() {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            log::warn!("[console] read error: {e}");
                            break;
                        }
                    };
                    let Some(event) = parse_line(&line) else {
                        continue;
                    };
                    progress.lines.fetch_add(1, Ordering::SeqCst);
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                progress.eof.store(true, Ordering::SeqCst);
                log::debug!("[console] end of input");
            })?;

        let transport = ConsoleTransport {
            rx,
            subscriptions: Vec::new(),
            connected: false,
            offline,
        };
        Ok((transport, input))
    }
}

impl Transport for ConsoleTransport {
    fn subscribe(&mut self, topic: &str) {
        self.subscriptions.retain(|t| t != topic);
        self.subscriptions.push(topic.to_string());
        log::debug!("[console] subscribed to {topic}");
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        if self.offline {
            return Err(TransportError::ConnectFailed("console is offline".into()));
        }
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn read_subscription(&mut self, timeout: Duration) -> Option<Inbound> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                // Reader is gone; behave like an idle link.
                std::thread::sleep(timeout);
                None
            }
        }
    }
}

/// Writes each status message to stdout as `<topic> <payload>`.
#[derive(Debug, Default)]
pub struct ConsolePublisher;

impl Publisher for ConsolePublisher {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(topic.as_bytes())
            .and_then(|_| stdout.write_all(b" "))
            .and_then(|_| stdout.write_all(payload))
            .and_then(|_| stdout.write_all(b"\n"))
            .and_then(|_| stdout.flush())
            .map_err(|e| TransportError::PublishFailed(format!("stdout: {e}")))
    }
}
