//! `run` subcommand: drive the runtime from stdin until input ends or Ctrl+C.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use neoring_lib::context::RuntimeContext;
use neoring_lib::device::SimulatedRing;
use neoring_lib::reconnect::ConnectionState;

use super::{Config, RUNNING, Result};
use crate::console::{ConsolePublisher, ConsoleTransport};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub(super) fn cmd_run(config: &Config, offline: bool) -> Result<()> {
    let ring = SimulatedRing::new(config.ring.pixel_count, config.initial_color());
    let (transport, input) = ConsoleTransport::spawn(std::io::stdin(), offline)?;

    let handle = RuntimeContext::start(
        config,
        Box::new(ring),
        Box::new(transport),
        Arc::new(ConsolePublisher),
    )?;
    log::info!(
        "[run] listening on {} and {}, status on {}",
        config.topics.get_color,
        config.topics.set_color,
        config.topics.status
    );

    while RUNNING.load(Ordering::SeqCst) {
        if handle.connection_state() == ConnectionState::Halted {
            break;
        }
        // Received count first: everything it covers is already queued or running.
        if input.drained(handle.stats().events_received()) && handle.is_idle() {
            log::debug!("[run] input drained");
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    handle.shutdown();
    let stats = handle.stats().snapshot();
    let result = handle.join();
    log::info!("[run] stopped: {stats:?}");
    result
}
