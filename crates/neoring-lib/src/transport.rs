//! Publish/subscribe transport boundary.
//!
//! The listener owns the subscription side ([`Transport`]): connecting,
//! polling for inbound events, and keeping the broker link alive. Workers only
//! ever need to publish status, so they hold a shared [`Publisher`] handle.

use std::fmt;
use std::time::Duration;

// ── Error type ──

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    ConnectFailed(String),
    Disconnected,
    PublishFailed(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::ConnectFailed(e) => write!(f, "Broker connection error: {e}"),
            TransportError::Disconnected => write!(f, "Not connected to the broker"),
            TransportError::PublishFailed(e) => write!(f, "Publish failed: {e}"),
        }
    }
}

impl std::error::Error for TransportError {}

pub type Result<T> = std::result::Result<T, TransportError>;

/// An event delivered on one of the subscribed topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl Inbound {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Inbound {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

// ── Traits ──

/// Subscription side of the broker client. Owned by the input listener.
pub trait Transport: Send {
    /// Register interest in a topic. Takes effect on the next connect.
    fn subscribe(&mut self, topic: &str);
    fn is_connected(&self) -> bool;
    fn connect(&mut self) -> Result<()>;
    fn disconnect(&mut self);
    /// Wait up to `timeout` for the next inbound event.
    fn read_subscription(&mut self, timeout: Duration) -> Option<Inbound>;
}

/// Publish side of the broker client. Shared by the workers.
pub trait Publisher: Send + Sync {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<()>;
}

/// Scripted transport and recording publisher for tests.
///
/// Always compiled (zero runtime cost), hidden from public docs.
#[doc(hidden)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use parking_lot::Mutex;

    /// Transport driven by test scripts. Clones share state.
    ///
    /// `connect()` pops the next scripted result; once the script runs out
    /// every connect succeeds. `read_subscription` returns queued events
    /// immediately and otherwise waits at most a few milliseconds.
    #[derive(Clone, Default)]
    pub struct ScriptedTransport {
        pub connect_script: Arc<Mutex<VecDeque<Result<()>>>>,
        pub connected: Arc<AtomicBool>,
        pub inbound: Arc<Mutex<VecDeque<Inbound>>>,
        pub subscriptions: Arc<Mutex<Vec<String>>>,
        pub connect_attempts: Arc<AtomicUsize>,
        pub disconnects: Arc<AtomicUsize>,
        pub reads: Arc<AtomicUsize>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue `n` connect failures ahead of any successes.
        pub fn fail_connects(&self, n: usize) {
            let mut script = self.connect_script.lock();
            for i in 0..n {
                script.push_back(Err(TransportError::ConnectFailed(format!(
                    "mock: refused #{}",
                    i + 1
                ))));
            }
        }

        pub fn push(&self, event: Inbound) {
            self.inbound.lock().push_back(event);
        }

        /// Simulate the broker dropping the link.
        pub fn drop_link(&self) {
            self.connected.store(false, Ordering::SeqCst);
        }

        pub fn attempts(&self) -> usize {
            self.connect_attempts.load(Ordering::SeqCst)
        }

        pub fn pending(&self) -> usize {
            self.inbound.lock().len()
        }
    }

    impl Transport for ScriptedTransport {
        fn subscribe(&mut self, topic: &str) {
            let mut subs = self.subscriptions.lock();
            subs.retain(|t| t != topic);
            subs.push(topic.to_string());
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        fn connect(&mut self) -> Result<()> {
            self.connect_attempts.fetch_add(1, Ordering::SeqCst);
            let result = self.connect_script.lock().pop_front().unwrap_or(Ok(()));
            if result.is_ok() {
                self.connected.store(true, Ordering::SeqCst);
            }
            result
        }

        fn disconnect(&mut self) {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            self.connected.store(false, Ordering::SeqCst);
        }

        fn read_subscription(&mut self, timeout: Duration) -> Option<Inbound> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if let Some(event) = self.inbound.lock().pop_front() {
                return Some(event);
            }
            std::thread::sleep(timeout.min(Duration::from_millis(2)));
            None
        }
    }

    /// Publisher that records every message. Clones share the record.
    #[derive(Clone, Default)]
    pub struct RecordingPublisher {
        pub published: Arc<Mutex<Vec<(String, String)>>>,
        pub fail: Arc<AtomicBool>,
    }

    impl RecordingPublisher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn messages(&self) -> Vec<(String, String)> {
            self.published.lock().clone()
        }

        pub fn count(&self) -> usize {
            self.published.lock().len()
        }
    }

    impl Publisher for RecordingPublisher {
        fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(TransportError::PublishFailed("mock: publish failure injected".into()));
            }
            self.published
                .lock()
                .push((topic.to_string(), String::from_utf8_lossy(payload).into_owned()));
            Ok(())
        }
    }
}
