//! Runtime wiring: builds the shared state and spawns the three service threads.
//!
//! Thread layout:
//! - `fast-worker`: drains the fast lane (queries) on `timing.fast_interval_ms`.
//! - `slow-worker`: drains the slow lane (commands) on `timing.slow_interval_ms`.
//! - `input-listener`: owns the transport, connects, classifies and enqueues.
//!
//! Both workers start paused and only run once the listener has connected.

use std::sync::Arc;
use std::thread::JoinHandle;

use crate::config::Config;
use crate::device::LedRing;
use crate::error::{NeoringError, Result};
use crate::handlers::HandlerContext;
use crate::led::SharedRing;
use crate::listener::{InputListener, ListenerShared};
use crate::queue::{DispatchQueues, DispatchStats, QueueLane};
use crate::reconnect::ConnectionState;
use crate::transport::{Publisher, Transport};
use crate::worker::{Worker, WorkerControl};

/// Shared state of one running instance.
#[derive(Debug)]
pub struct RuntimeContext {
    ring: Arc<SharedRing>,
    queues: Arc<DispatchQueues>,
    stats: Arc<DispatchStats>,
    fast: Arc<WorkerControl>,
    slow: Arc<WorkerControl>,
    listener: Arc<ListenerShared>,
}

impl RuntimeContext {
    /// Initialize the ring and spawn the workers and listener.
    ///
    /// The ring is initialized before any thread exists. A driver that fails
    /// to initialize aborts startup.
    pub fn start(
        config: &Config,
        ring: Box<dyn LedRing>,
        transport: Box<dyn Transport>,
        publisher: Arc<dyn Publisher>,
    ) -> Result<RuntimeHandle> {
        if let Err(errors) = config.validate() {
            let msg: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            return Err(NeoringError::Config(msg.join("; ")));
        }

        let ring = Arc::new(SharedRing::new(ring));
        let initial = ring.initialize()?;
        log::info!("[ring] initialized, showing {initial}");

        let ctx = RuntimeContext {
            ring: Arc::clone(&ring),
            queues: Arc::new(DispatchQueues::new()),
            stats: Arc::new(DispatchStats::default()),
            fast: Arc::new(WorkerControl::paused()),
            slow: Arc::new(WorkerControl::paused()),
            listener: Arc::new(ListenerShared::default()),
        };

        let handler_ctx = HandlerContext {
            ring,
            publisher,
            status_topic: config.topics.status.clone(),
        };

        let mut workers = Vec::with_capacity(2);
        for (name, lane, interval, control) in [
            ("fast-worker", QueueLane::Fast, config.timing.fast_interval(), &ctx.fast),
            ("slow-worker", QueueLane::Slow, config.timing.slow_interval(), &ctx.slow),
        ] {
            let worker = Worker::new(
                name,
                lane,
                interval,
                Arc::clone(control),
                Arc::clone(&ctx.queues),
                handler_ctx.clone(),
                Arc::clone(&ctx.stats),
            );
            match spawn(name, move || worker.run()) {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    ctx.stop_workers();
                    return Err(e);
                }
            }
        }

        let listener = InputListener::new(
            transport,
            config.topics.router(),
            Arc::clone(&ctx.queues),
            Arc::clone(&ctx.stats),
            vec![Arc::clone(&ctx.fast), Arc::clone(&ctx.slow)],
            config.timing.listener(),
        )
        .with_shared(Arc::clone(&ctx.listener));

        let listener = match spawn("input-listener", move || listener.run()) {
            Ok(handle) => handle,
            Err(e) => {
                ctx.stop_workers();
                return Err(e);
            }
        };

        log::info!("[runtime] started");
        Ok(RuntimeHandle {
            ctx,
            workers,
            listener,
        })
    }

    fn stop_workers(&self) {
        self.fast.shutdown();
        self.slow.shutdown();
    }
}

fn spawn<T: Send + 'static>(
    name: &str,
    f: impl FnOnce() -> T + Send + 'static,
) -> Result<JoinHandle<T>> {
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map_err(|e| NeoringError::Thread(format!("spawn {name}: {e}")))
}

/// Owner of a started runtime.
///
/// Call [`shutdown`](Self::shutdown) before [`join`](Self::join); a runtime
/// that was never asked to stop keeps its threads running.
pub struct RuntimeHandle {
    ctx: RuntimeContext,
    workers: Vec<JoinHandle<()>>,
    listener: JoinHandle<Result<()>>,
}

impl RuntimeHandle {
    pub fn stats(&self) -> &DispatchStats {
        &self.ctx.stats
    }

    pub fn ring(&self) -> &SharedRing {
        &self.ctx.ring
    }

    pub fn queues(&self) -> &DispatchQueues {
        &self.ctx.queues
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.ctx.listener.connection_state()
    }

    /// Both queues empty and neither worker holding an envelope.
    pub fn is_idle(&self) -> bool {
        self.ctx.queues.is_empty(QueueLane::Fast)
            && self.ctx.queues.is_empty(QueueLane::Slow)
            && !self.ctx.fast.is_busy()
            && !self.ctx.slow.is_busy()
    }

    /// Ask every thread to stop. Non-blocking.
    pub fn shutdown(&self) {
        self.ctx.listener.request_shutdown();
        self.ctx.stop_workers();
        self.listener.thread().unpark();
    }

    /// Wait for all threads. Returns the listener's result, so a fail-stopped
    /// runtime yields [`NeoringError::Halted`].
    pub fn join(self) -> Result<()> {
        for handle in self.workers {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            handle
                .join()
                .map_err(|_| NeoringError::Thread(format!("{name} panicked")))?;
        }
        self.listener
            .join()
            .map_err(|_| NeoringError::Thread("input-listener panicked".into()))?
    }
}

impl std::fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("ctx", &self.ctx)
            .field("workers", &self.workers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SimulatedRing;
    use crate::device::mock::{MockRing, RingCall};
    use crate::led::Rgb;
    use crate::transport::Inbound;
    use crate::transport::mock::{RecordingPublisher, ScriptedTransport};
    use std::time::{Duration, Instant};

    fn fast_config() -> Config {
        let mut c = Config::default();
        c.timing.read_timeout_ms = 20;
        c.timing.post_enqueue_yield_ms = 1;
        c.timing.fast_interval_ms = 2;
        c.timing.slow_interval_ms = 2;
        c.timing.retry_backoff_ms = 1;
        c.timing.settle_ms = 1;
        c
    }

    fn wait_until(cond: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn command_flows_through_to_status() {
        let ring = MockRing::new();
        let transport = ScriptedTransport::new();
        let publisher = RecordingPublisher::new();
        let config = fast_config();

        let handle = RuntimeContext::start(
            &config,
            Box::new(ring.clone()),
            Box::new(transport.clone()),
            Arc::new(publisher.clone()),
        )
        .unwrap();

        transport.push(Inbound::new(
            "neoring/set-color",
            br#"{"r":255,"g":0,"b":0}"#.to_vec(),
        ));
        assert!(wait_until(|| publisher.count() == 1));
        assert!(wait_until(|| handle.is_idle()));

        assert_eq!(
            publisher.messages(),
            vec![("neoring/status".to_string(), r#"{"r":255,"g":0,"b":0}"#.to_string())]
        );
        assert_eq!(handle.ring().snapshot(), Rgb::new(255, 0, 0));
        assert_eq!(handle.connection_state(), ConnectionState::Connected);
        assert_eq!(handle.stats().snapshot().processed_slow, 1);

        handle.shutdown();
        handle.join().unwrap();
        assert_eq!(ring.calls()[0], RingCall::Initialize);
    }

    #[test]
    fn retry_exhaustion_joins_with_halted() {
        let transport = ScriptedTransport::new();
        transport.fail_connects(3);
        let publisher = RecordingPublisher::new();

        let handle = RuntimeContext::start(
            &fast_config(),
            Box::new(MockRing::new()),
            Box::new(transport.clone()),
            Arc::new(publisher),
        )
        .unwrap();

        assert!(wait_until(|| handle.connection_state() == ConnectionState::Halted));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(transport.attempts(), 3);

        handle.shutdown();
        assert!(matches!(handle.join(), Err(NeoringError::Halted)));
    }

    #[test]
    fn ring_init_failure_aborts_start() {
        let result = RuntimeContext::start(
            &fast_config(),
            Box::new(SimulatedRing::new(0, Rgb::OFF)),
            Box::new(ScriptedTransport::new()),
            Arc::new(RecordingPublisher::new()),
        );
        assert!(matches!(result, Err(NeoringError::Device(_))));
    }

    #[test]
    fn invalid_config_aborts_start() {
        let mut config = fast_config();
        config.timing.max_connect_attempts = 0;
        let result = RuntimeContext::start(
            &config,
            Box::new(MockRing::new()),
            Box::new(ScriptedTransport::new()),
            Arc::new(RecordingPublisher::new()),
        );
        match result {
            Err(NeoringError::Config(msg)) => assert!(msg.contains("max_connect_attempts")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn fresh_runtime_is_idle() {
        let handle = RuntimeContext::start(
            &fast_config(),
            Box::new(MockRing::new()),
            Box::new(ScriptedTransport::new()),
            Arc::new(RecordingPublisher::new()),
        )
        .unwrap();
        assert!(handle.is_idle());
        handle.shutdown();
        handle.join().unwrap();
    }
}
