//! Input listener: polls the transport, classifies events, and feeds the
//! dispatch queues. Also owns the broker connection lifecycle.
//!
//! One cycle = make sure the link is up, then poll for at most
//! `read_timeout`, stopping as soon as one event for a known topic has been
//! dispatched. This caps the event rate per cycle, which is fine for a
//! human-driven control protocol.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::envelope::{ActionKind, Envelope, Router};
use crate::error::{NeoringError, Result};
use crate::queue::{DispatchQueues, DispatchStats, QueueLane};
use crate::reconnect::{ConnectionManager, ConnectionState, RetryPolicy};
use crate::transport::{Inbound, Transport};
use crate::worker::WorkerControl;

/// How often a halted listener wakes to check for shutdown.
const HALT_PARK: Duration = Duration::from_millis(100);

/// Millisecond clock that may wrap around.
pub trait Clock: Send {
    fn now_millis(&self) -> u32;
}

/// `Instant`-based clock truncated to 32 bits (wraps after ~49.7 days).
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&self) -> u32 {
        self.origin.elapsed().as_millis() as u32
    }
}

/// Elapsed-time accounting for one polling window.
///
/// If a sample is smaller than the previous one the clock wrapped; the
/// reference is reset and that interval counts as zero.
#[derive(Debug, Clone, Copy)]
pub struct CycleTimer {
    last: u32,
    elapsed: u32,
}

impl CycleTimer {
    pub fn start(now: u32) -> Self {
        Self {
            last: now,
            elapsed: 0,
        }
    }

    pub fn tick(&mut self, now: u32) -> u32 {
        if now < self.last {
            self.last = now;
        }
        self.elapsed = self.elapsed.saturating_add(now - self.last);
        self.last = now;
        self.elapsed
    }

    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }
}

/// What happened to one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Enqueued(QueueLane),
    /// Lane was full; the action was dropped.
    QueueFull(QueueLane),
    /// Known topic, but the payload did not fit an envelope.
    Oversize(ActionKind),
    /// Topic matched no handler.
    Unresolved,
}

impl DispatchOutcome {
    /// Events on a known topic end the polling cycle, dispatched or not.
    pub fn ends_cycle(&self) -> bool {
        !matches!(self, DispatchOutcome::Unresolved)
    }
}

#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub read_timeout: Duration,
    pub post_enqueue_yield: Duration,
    pub retry: RetryPolicy,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(2000),
            post_enqueue_yield: Duration::from_millis(250),
            retry: RetryPolicy::default(),
        }
    }
}

/// State the listener exposes to the rest of the runtime.
#[derive(Debug)]
pub struct ListenerShared {
    shutdown: AtomicBool,
    /// Written by the connection manager at every transition.
    state: Arc<Mutex<ConnectionState>>,
}

impl Default for ListenerShared {
    fn default() -> Self {
        Self {
            shutdown: AtomicBool::new(false),
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
        }
    }
}

impl ListenerShared {
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.lock()
    }
}

pub struct InputListener {
    transport: Box<dyn Transport>,
    router: Router,
    queues: Arc<DispatchQueues>,
    stats: Arc<DispatchStats>,
    workers: Vec<Arc<WorkerControl>>,
    manager: ConnectionManager,
    config: ListenerConfig,
    clock: Box<dyn Clock>,
    shared: Arc<ListenerShared>,
}

impl InputListener {
    pub fn new(
        transport: Box<dyn Transport>,
        router: Router,
        queues: Arc<DispatchQueues>,
        stats: Arc<DispatchStats>,
        workers: Vec<Arc<WorkerControl>>,
        config: ListenerConfig,
    ) -> Self {
        let shared = Arc::new(ListenerShared::default());
        let mut manager = ConnectionManager::new(config.retry.clone());
        manager.share_state(Arc::clone(&shared.state));
        Self {
            transport,
            router,
            queues,
            stats,
            workers,
            manager,
            config,
            clock: Box::new(MonotonicClock::default()),
            shared,
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use an externally owned shutdown flag and state cell.
    pub fn with_shared(mut self, shared: Arc<ListenerShared>) -> Self {
        self.manager.share_state(Arc::clone(&shared.state));
        self.shared = shared;
        self
    }

    pub fn shared(&self) -> Arc<ListenerShared> {
        Arc::clone(&self.shared)
    }

    /// Clear and re-register both subscriptions.
    pub fn subscribe_all(&mut self) {
        for topic in self.router.topics() {
            self.transport.subscribe(topic);
        }
    }

    /// Classify one event and route it to its lane.
    pub fn dispatch(&self, event: &Inbound) -> DispatchOutcome {
        let kind = self.router.classify(event);
        let env = Envelope::new(kind, &event.payload);

        let outcome = match kind {
            None => {
                log::warn!("action couldn't be processed: no handler for {:?}", event.topic);
                self.stats.record_unresolved();
                DispatchOutcome::Unresolved
            }
            Some(kind) if env.is_empty() => {
                log::warn!(
                    "dropping {:?}: payload of {} bytes is larger than the envelope",
                    event.topic,
                    event.payload.len()
                );
                self.stats.record_oversize();
                DispatchOutcome::Oversize(kind)
            }
            Some(kind) => {
                let lane = kind.lane();
                match self.queues.try_enqueue(lane, env) {
                    Ok(()) => {
                        log::debug!("sent to {lane} actions queue");
                        self.stats.record_enqueued(lane);
                        DispatchOutcome::Enqueued(lane)
                    }
                    Err(_) => {
                        log::warn!("action couldn't be sent to the {lane} queue (full)");
                        self.stats.record_full();
                        DispatchOutcome::QueueFull(lane)
                    }
                }
            }
        };
        self.stats.record_received();

        if let DispatchOutcome::Enqueued(_) = outcome {
            std::thread::sleep(self.config.post_enqueue_yield);
        }
        outcome
    }

    /// Wait up to `timeout` for one event and dispatch it.
    pub fn poll_once(&mut self, timeout: Duration) -> Option<DispatchOutcome> {
        let event = self.transport.read_subscription(timeout)?;
        Some(self.dispatch(&event))
    }

    /// One connect-then-poll cycle.
    pub fn run_cycle(&mut self) -> ConnectionState {
        let workers: Vec<&WorkerControl> = self.workers.iter().map(|w| w.as_ref()).collect();
        let state = self
            .manager
            .ensure_connected(self.transport.as_mut(), &workers);
        if state != ConnectionState::Connected {
            return state;
        }

        let budget = self.config.read_timeout.as_millis().min(u32::MAX as u128) as u32;
        let mut timer = CycleTimer::start(self.clock.now_millis());
        while timer.elapsed() < budget && !self.shared.is_shutdown() {
            let remaining = Duration::from_millis(u64::from(budget - timer.elapsed()));
            if let Some(outcome) = self.poll_once(remaining) {
                if outcome.ends_cycle() {
                    break;
                }
            }
            timer.tick(self.clock.now_millis());
        }
        state
    }

    /// Service loop. Returns `Ok` on shutdown, or `Err(Halted)` once a
    /// halted listener is asked to shut down.
    pub fn run(mut self) -> Result<()> {
        self.subscribe_all();
        while !self.shared.is_shutdown() {
            if self.run_cycle() == ConnectionState::Halted {
                return self.halt();
            }
        }
        Ok(())
    }

    /// Fail-stop: make no further progress.
    fn halt(&self) -> Result<()> {
        log::error!("broker unreachable, halting; reset the device to recover");
        while !self.shared.is_shutdown() {
            std::thread::park_timeout(HALT_PARK);
        }
        Err(NeoringError::Halted)
    }
}
