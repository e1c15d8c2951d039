//! Fixed-capacity dispatch queues and their counters.
//!
//! Two lanes, each a lock-free ring buffer of [`Envelope`] values. Enqueue
//! never blocks: a full lane rejects the envelope and the action is dropped,
//! so a slow consumer can never stall the listener (which also owns the
//! broker keep-alive).

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::queue::ArrayQueue;
use serde::Serialize;

use crate::envelope::Envelope;

pub const FAST_QUEUE_CAPACITY: usize = 2;
pub const SLOW_QUEUE_CAPACITY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueLane {
    /// Status queries.
    Fast,
    /// Color commands.
    Slow,
}

impl std::fmt::Display for QueueLane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueLane::Fast => write!(f, "fast"),
            QueueLane::Slow => write!(f, "slow"),
        }
    }
}

#[derive(Debug)]
pub struct DispatchQueues {
    fast: ArrayQueue<Envelope>,
    slow: ArrayQueue<Envelope>,
}

impl Default for DispatchQueues {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchQueues {
    pub fn new() -> Self {
        Self::with_capacities(FAST_QUEUE_CAPACITY, SLOW_QUEUE_CAPACITY)
    }

    fn with_capacities(fast: usize, slow: usize) -> Self {
        DispatchQueues {
            fast: ArrayQueue::new(fast),
            slow: ArrayQueue::new(slow),
        }
    }

    fn lane(&self, lane: QueueLane) -> &ArrayQueue<Envelope> {
        match lane {
            QueueLane::Fast => &self.fast,
            QueueLane::Slow => &self.slow,
        }
    }

    /// Non-blocking enqueue. Hands the envelope back if the lane is full.
    pub fn try_enqueue(&self, lane: QueueLane, env: Envelope) -> Result<(), Envelope> {
        self.lane(lane).push(env)
    }

    /// Non-blocking dequeue, FIFO within the lane.
    pub fn try_dequeue(&self, lane: QueueLane) -> Option<Envelope> {
        self.lane(lane).pop()
    }

    pub fn len(&self, lane: QueueLane) -> usize {
        self.lane(lane).len()
    }

    pub fn is_empty(&self, lane: QueueLane) -> bool {
        self.lane(lane).is_empty()
    }

    pub fn capacity(&self, lane: QueueLane) -> usize {
        self.lane(lane).capacity()
    }
}

/// Dispatch counters, updated lock-free by the listener and workers.
#[derive(Debug, Default)]
pub struct DispatchStats {
    events_received: AtomicU64,
    enqueued_fast: AtomicU64,
    enqueued_slow: AtomicU64,
    dropped_full: AtomicU64,
    dropped_unresolved: AtomicU64,
    dropped_oversize: AtomicU64,
    processed_fast: AtomicU64,
    processed_slow: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub events_received: u64,
    pub enqueued_fast: u64,
    pub enqueued_slow: u64,
    pub dropped_full: u64,
    pub dropped_unresolved: u64,
    pub dropped_oversize: u64,
    pub processed_fast: u64,
    pub processed_slow: u64,
}

impl DispatchStats {
    pub fn record_received(&self) {
        self.events_received.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_enqueued(&self, lane: QueueLane) {
        match lane {
            QueueLane::Fast => &self.enqueued_fast,
            QueueLane::Slow => &self.enqueued_slow,
        }
        .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_full(&self) {
        self.dropped_full.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unresolved(&self) {
        self.dropped_unresolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_oversize(&self) {
        self.dropped_oversize.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_processed(&self, lane: QueueLane) {
        match lane {
            QueueLane::Fast => &self.processed_fast,
            QueueLane::Slow => &self.processed_slow,
        }
        .fetch_add(1, Ordering::SeqCst);
    }

    pub fn events_received(&self) -> u64 {
        self.events_received.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            events_received: self.events_received.load(Ordering::SeqCst),
            enqueued_fast: self.enqueued_fast.load(Ordering::Relaxed),
            enqueued_slow: self.enqueued_slow.load(Ordering::Relaxed),
            dropped_full: self.dropped_full.load(Ordering::Relaxed),
            dropped_unresolved: self.dropped_unresolved.load(Ordering::Relaxed),
            dropped_oversize: self.dropped_oversize.load(Ordering::Relaxed),
            processed_fast: self.processed_fast.load(Ordering::SeqCst),
            processed_slow: self.processed_slow.load(Ordering::SeqCst),
        }
    }
}
