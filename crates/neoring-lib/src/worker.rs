//! Queue workers: one permanent service loop per lane.
//!
//! Each worker polls its lane on a fixed cadence, runs the envelope's handler,
//! then clears the slot so nothing leaks into the next cycle. Workers can be
//! paused by the listener while the broker link is down; anything already
//! queued stays queued until they resume.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::envelope::Envelope;
use crate::handlers::HandlerContext;
use crate::queue::{DispatchQueues, DispatchStats, QueueLane};

/// Pause/resume/shutdown handle shared between a worker and the listener.
///
/// Only the listener pauses and resumes; workers never touch each other's
/// controls.
#[derive(Debug, Default)]
pub struct WorkerControl {
    paused: Mutex<bool>,
    wake: Condvar,
    shutdown: AtomicBool,
    busy: AtomicBool,
}

impl WorkerControl {
    /// A control that starts paused. Workers wait for the first connect.
    pub fn paused() -> Self {
        WorkerControl {
            paused: Mutex::new(true),
            ..Default::default()
        }
    }

    pub fn pause(&self) {
        *self.paused.lock() = true;
    }

    pub fn resume(&self) {
        *self.paused.lock() = false;
        self.wake.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.lock()
    }

    /// Block while paused. Returns early on shutdown.
    pub fn wait_while_paused(&self) {
        let mut paused = self.paused.lock();
        while *paused && !self.is_shutdown() {
            self.wake.wait(&mut paused);
        }
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // Take the lock so a worker between its check and its wait sees the flag.
        let _guard = self.paused.lock();
        self.wake.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// True while the worker holds a dequeued envelope.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

pub struct Worker {
    name: &'static str,
    lane: QueueLane,
    interval: Duration,
    control: Arc<WorkerControl>,
    queues: Arc<DispatchQueues>,
    ctx: HandlerContext,
    stats: Arc<DispatchStats>,
}

impl Worker {
    pub fn new(
        name: &'static str,
        lane: QueueLane,
        interval: Duration,
        control: Arc<WorkerControl>,
        queues: Arc<DispatchQueues>,
        ctx: HandlerContext,
        stats: Arc<DispatchStats>,
    ) -> Self {
        Worker {
            name,
            lane,
            interval,
            control,
            queues,
            ctx,
            stats,
        }
    }

    /// Dequeue into `slot` and process it. Returns `true` if an envelope ran.
    ///
    /// The slot is always left cleared.
    pub fn service_once(&self, slot: &mut Envelope) -> bool {
        self.control.busy.store(true, Ordering::SeqCst);
        let ran = match self.queues.try_dequeue(self.lane) {
            Some(env) => {
                *slot = env;
                log::debug!("[{}] executing {:?}", self.name, slot.action());
                slot.dispatch(&self.ctx);
                slot.clear();
                self.stats.record_processed(self.lane);
                true
            }
            None => false,
        };
        self.control.busy.store(false, Ordering::SeqCst);
        ran
    }

    /// Service loop. Runs until shutdown is requested.
    pub fn run(self) {
        let mut slot = Envelope::empty();
        loop {
            self.control.wait_while_paused();
            if self.control.is_shutdown() {
                break;
            }
            self.service_once(&mut slot);
            std::thread::sleep(self.interval);
        }
        log::debug!("[{}] stopped", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::{MockRing, RingCall};
    use crate::envelope::ActionKind;
    use crate::led::{Rgb, SharedRing};
    use crate::transport::mock::RecordingPublisher;
    use std::time::Instant;

    struct Fixture {
        queues: Arc<DispatchQueues>,
        control: Arc<WorkerControl>,
        stats: Arc<DispatchStats>,
        mock_ring: MockRing,
        publisher: RecordingPublisher,
        ctx: HandlerContext,
    }

    fn fixture() -> Fixture {
        let mock_ring = MockRing::new();
        let publisher = RecordingPublisher::new();
        let ring = Arc::new(SharedRing::new(Box::new(mock_ring.clone())));
        ring.initialize().unwrap();
        Fixture {
            queues: Arc::new(DispatchQueues::new()),
            control: Arc::new(WorkerControl::paused()),
            stats: Arc::new(DispatchStats::default()),
            ctx: HandlerContext {
                ring,
                publisher: Arc::new(publisher.clone()),
                status_topic: "status".into(),
            },
            mock_ring,
            publisher,
        }
    }

    fn slow_worker(f: &Fixture) -> Worker {
        Worker::new(
            "slow",
            QueueLane::Slow,
            Duration::from_millis(1),
            f.control.clone(),
            f.queues.clone(),
            f.ctx.clone(),
            f.stats.clone(),
        )
    }

    fn wait_until(deadline: Duration, cond: impl Fn() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        cond()
    }

    #[test]
    fn service_once_clears_slot() {
        let f = fixture();
        let worker = slow_worker(&f);
        let env = Envelope::new(Some(ActionKind::Command), br#"{"r":1,"g":2,"b":3}"#);
        f.queues.try_enqueue(QueueLane::Slow, env).unwrap();

        let mut slot = Envelope::empty();
        assert!(worker.service_once(&mut slot));
        assert!(slot.is_empty());
        assert_eq!(slot.len(), 0);
        assert!(slot.buffer().iter().all(|&b| b == 0));
        assert_eq!(*f.mock_ring.color.lock(), Rgb::new(1, 2, 3));
        assert!(!f.control.is_busy());
    }

    #[test]
    fn service_once_on_empty_lane_is_noop() {
        let f = fixture();
        let worker = slow_worker(&f);
        let mut slot = Envelope::empty();
        assert!(!worker.service_once(&mut slot));
        assert_eq!(f.stats.snapshot().processed_slow, 0);
    }

    #[test]
    fn malformed_payload_does_not_stop_worker() {
        let f = fixture();
        let worker = slow_worker(&f);
        f.queues
            .try_enqueue(QueueLane::Slow, Envelope::new(Some(ActionKind::Command), b"{nope"))
            .unwrap();
        f.queues
            .try_enqueue(
                QueueLane::Slow,
                Envelope::new(Some(ActionKind::Command), br#"{"r":9,"g":9,"b":9}"#),
            )
            .unwrap();
        let mut slot = Envelope::empty();
        assert!(worker.service_once(&mut slot));
        assert!(slot.is_empty());
        assert!(worker.service_once(&mut slot));
        assert_eq!(f.stats.snapshot().processed_slow, 2);
        assert_eq!(
            f.mock_ring.writes(),
            vec![RingCall::Initialize, RingCall::SetColor(Rgb::new(9, 9, 9))]
        );
    }

    #[test]
    fn paused_worker_leaves_queue_intact_until_resumed() {
        let f = fixture();
        let worker = slow_worker(&f);
        f.queues
            .try_enqueue(
                QueueLane::Slow,
                Envelope::new(Some(ActionKind::Command), br#"{"r":4,"g":4,"b":4}"#),
            )
            .unwrap();

        let handle = std::thread::spawn(move || worker.run());
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(f.queues.len(QueueLane::Slow), 1, "paused worker must not drain");
        assert_eq!(f.publisher.count(), 0);

        f.control.resume();
        assert!(wait_until(Duration::from_secs(2), || f.publisher.count() == 1));
        assert!(f.queues.is_empty(QueueLane::Slow));

        f.control.shutdown();
        handle.join().unwrap();
    }

    #[test]
    fn shutdown_wakes_paused_worker() {
        let f = fixture();
        let worker = slow_worker(&f);
        let handle = std::thread::spawn(move || worker.run());
        std::thread::sleep(Duration::from_millis(10));
        f.control.shutdown();
        handle.join().unwrap();
        assert!(f.control.is_paused());
    }

    #[test]
    fn control_pause_resume_flags() {
        let c = WorkerControl::default();
        assert!(!c.is_paused());
        c.pause();
        assert!(c.is_paused());
        c.resume();
        assert!(!c.is_paused());
        assert!(WorkerControl::paused().is_paused());
    }
}
