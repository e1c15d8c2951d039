//! Broker connection lifecycle with fixed backoff and a bounded retry budget.
//!
//! While the link is down both workers are paused so nothing assumes a live
//! transport. Connect attempts are retried with a fixed backoff; once the
//! budget is spent the manager enters [`ConnectionState::Halted`] and never
//! attempts to connect again. There is no degraded mode: without a broker the
//! device has nothing to serve.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::transport::Transport;
use crate::worker::WorkerControl;

/// Configuration for reconnection attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Connect attempts before halting.
    pub max_attempts: u32,
    /// Delay after each failed attempt.
    pub backoff: Duration,
    /// Delay after a successful connect, before polling resumes.
    pub settle: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(5),
            settle: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Terminal. Retries are exhausted.
    Halted,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Halted => "halted",
        };
        f.write_str(s)
    }
}

/// Connection state machine.
///
/// The current state lives in a shared cell so other threads can watch it
/// move through `Connecting` while the retry loop is still backing off.
#[derive(Debug)]
pub struct ConnectionManager {
    policy: RetryPolicy,
    state: Arc<Mutex<ConnectionState>>,
    attempts: u64,
}

impl ConnectionManager {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            attempts: 0,
        }
    }

    /// Publish state changes into `cell`, seeding it with the current state.
    pub fn share_state(&mut self, cell: Arc<Mutex<ConnectionState>>) {
        let current = self.state();
        *cell.lock() = current;
        self.state = cell;
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    fn set_state(&self, state: ConnectionState) -> ConnectionState {
        *self.state.lock() = state;
        state
    }

    /// Total connect attempts made over the manager's lifetime.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Make sure the transport is connected.
    ///
    /// - Already connected: no-op.
    /// - Otherwise: pause `workers`, retry `connect()` up to the budget, and
    ///   either resume them and settle, or halt.
    /// - Halted: returns immediately without touching the transport.
    pub fn ensure_connected(
        &mut self,
        transport: &mut dyn Transport,
        workers: &[&WorkerControl],
    ) -> ConnectionState {
        if self.state() == ConnectionState::Halted {
            return ConnectionState::Halted;
        }
        if transport.is_connected() {
            return self.set_state(ConnectionState::Connected);
        }

        log::info!("connecting to broker...");
        self.set_state(ConnectionState::Connecting);
        for w in workers {
            w.pause();
        }

        let mut retries = self.policy.max_attempts;
        loop {
            self.attempts += 1;
            match transport.connect() {
                Ok(()) => break,
                Err(e) => {
                    log::warn!(
                        "{e} (retrying in {:.1}s, {} attempt(s) left)",
                        self.policy.backoff.as_secs_f64(),
                        retries.saturating_sub(1)
                    );
                    transport.disconnect();
                    std::thread::sleep(self.policy.backoff);

                    retries = retries.saturating_sub(1);
                    if retries == 0 {
                        log::error!("could not connect to the broker, ran out of retries");
                        return self.set_state(ConnectionState::Halted);
                    }
                }
            }
        }

        log::info!("connected to broker");
        for w in workers {
            w.resume();
        }
        std::thread::sleep(self.policy.settle);
        self.set_state(ConnectionState::Connected)
    }
}
