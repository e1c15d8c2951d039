//! LED ring driver boundary: trait + simulated backend.

use std::fmt;

use crate::led::Rgb;

// ── Error type ──

/// LED ring driver errors.
///
/// String payloads follow the convention **"context: details"** where *context*
/// identifies the operation (e.g. `"set_color"`, `"begin"`) and *details*
/// describes what went wrong.
#[derive(Debug)]
pub enum DeviceError {
    InitFailed(String),
    WriteFailed(String),
    ReadFailed(String),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::InitFailed(e) => write!(f, "LED ring init failed: {e}"),
            DeviceError::WriteFailed(e) => write!(f, "LED ring write failed: {e}"),
            DeviceError::ReadFailed(e) => write!(f, "LED ring read failed: {e}"),
        }
    }
}

impl std::error::Error for DeviceError {}

pub type Result<T> = std::result::Result<T, DeviceError>;

// ── Trait ──

/// Addressable LED ring driver.
///
/// Calls are expected to return quickly relative to worker cadence. A timed
/// fade is owned by the driver; callers only request it.
pub trait LedRing: Send {
    fn initialize(&mut self) -> Result<()>;
    fn set_color(&mut self, color: Rgb) -> Result<()>;
    fn fade_color(&mut self, color: Rgb, duration: u16) -> Result<()>;
    fn read_color(&mut self) -> Result<Rgb>;
}

// ── Simulated backend ──

/// Software ring used by the CLI when no hardware is attached.
///
/// Every pixel shows the same color. A fade jumps straight to its target.
#[derive(Debug)]
pub struct SimulatedRing {
    pixels: Vec<Rgb>,
    initial: Rgb,
    initialized: bool,
}

impl SimulatedRing {
    pub fn new(pixel_count: usize, initial: Rgb) -> Self {
        SimulatedRing {
            pixels: vec![Rgb::OFF; pixel_count],
            initial,
            initialized: false,
        }
    }

    fn fill(&mut self, color: Rgb) -> Result<()> {
        if !self.initialized {
            return Err(DeviceError::WriteFailed("fill: ring not initialized".into()));
        }
        self.pixels.iter_mut().for_each(|p| *p = color);
        Ok(())
    }
}

impl LedRing for SimulatedRing {
    fn initialize(&mut self) -> Result<()> {
        if self.pixels.is_empty() {
            return Err(DeviceError::InitFailed("begin: ring has no pixels".into()));
        }
        self.initialized = true;
        self.fill(self.initial)
    }

    fn set_color(&mut self, color: Rgb) -> Result<()> {
        self.fill(color)
    }

    fn fade_color(&mut self, color: Rgb, duration: u16) -> Result<()> {
        log::debug!("[ring] fade to {color} over {duration}");
        self.fill(color)
    }

    fn read_color(&mut self) -> Result<Rgb> {
        self.pixels
            .first()
            .copied()
            .ok_or_else(|| DeviceError::ReadFailed("get_color: ring has no pixels".into()))
    }
}

/// In-memory mock ring for unit and integration tests.
///
/// Always compiled (zero runtime cost), hidden from public docs.
#[doc(hidden)]
pub mod mock {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use parking_lot::Mutex;

    /// A driver call recorded by [`MockRing`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum RingCall {
        Initialize,
        SetColor(Rgb),
        FadeColor(Rgb, u16),
        ReadColor,
    }

    /// Mock driver. Clones share the same call log and color, so a test can
    /// keep one clone for inspection after boxing the other into a `SharedRing`.
    #[derive(Clone, Default)]
    pub struct MockRing {
        /// Recorded driver calls, in order.
        pub calls: Arc<Mutex<Vec<RingCall>>>,
        /// Current color as the driver reports it.
        pub color: Arc<Mutex<Rgb>>,
        /// If true, `set_color` and `fade_color` return an error.
        pub fail_writes: Arc<AtomicBool>,
        /// If true, `read_color` returns an error.
        pub fail_reads: Arc<AtomicBool>,
    }

    impl MockRing {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_color(color: Rgb) -> Self {
            let ring = Self::new();
            *ring.color.lock() = color;
            ring
        }

        pub fn calls(&self) -> Vec<RingCall> {
            self.calls.lock().clone()
        }

        /// Recorded calls excluding reads.
        pub fn writes(&self) -> Vec<RingCall> {
            self.calls()
                .into_iter()
                .filter(|c| !matches!(c, RingCall::ReadColor))
                .collect()
        }

        pub fn count(&self, pred: impl Fn(&RingCall) -> bool) -> usize {
            self.calls.lock().iter().filter(|c| pred(c)).count()
        }

        fn write(&mut self, call: RingCall, color: Rgb) -> Result<()> {
            self.calls.lock().push(call);
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(DeviceError::WriteFailed("mock: write failure injected".into()));
            }
            *self.color.lock() = color;
            Ok(())
        }
    }

    impl LedRing for MockRing {
        fn initialize(&mut self) -> Result<()> {
            self.calls.lock().push(RingCall::Initialize);
            Ok(())
        }

        fn set_color(&mut self, color: Rgb) -> Result<()> {
            self.write(RingCall::SetColor(color), color)
        }

        fn fade_color(&mut self, color: Rgb, duration: u16) -> Result<()> {
            self.write(RingCall::FadeColor(color, duration), color)
        }

        fn read_color(&mut self) -> Result<Rgb> {
            self.calls.lock().push(RingCall::ReadColor);
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(DeviceError::ReadFailed("mock: read failure injected".into()));
            }
            Ok(*self.color.lock())
        }
    }
}
