//! The shared LED ring: one driver, one lock, one color snapshot.
//!
//! All driver access goes through [`SharedRing`]. Handlers use
//! [`SharedRing::try_with`], which follows a **best-effort, skip-on-contention**
//! contract: if the lock is held, the caller's critical section does not run
//! and the work is dropped for this cycle. Stale commands never queue up
//! behind the lock and fire late.
//!
//! Blocking acquisition ([`SharedRing::with_blocking`]) is reserved for
//! startup initialization.

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use super::Rgb;
use crate::device::{self, LedRing};

pub struct SharedRing {
    driver: Mutex<Box<dyn LedRing>>,
    /// Last color read back from the driver, packed `0x00RRGGBB`.
    snapshot: AtomicU32,
}

impl SharedRing {
    pub fn new(driver: Box<dyn LedRing>) -> Self {
        SharedRing {
            driver: Mutex::new(driver),
            snapshot: AtomicU32::new(Rgb::OFF.to_packed()),
        }
    }

    /// Initialize the driver under a blocking lock and record its starting color.
    pub fn initialize(&self) -> device::Result<Rgb> {
        self.with_blocking(|ring| {
            ring.initialize()?;
            let color = ring.read_color()?;
            Ok(color)
        })
        .inspect(|color| self.record(*color))
    }

    /// Run `f` with the driver if the lock is free right now.
    ///
    /// Returns `None` without running `f` when another thread holds the lock.
    pub fn try_with<T>(&self, f: impl FnOnce(&mut dyn LedRing) -> T) -> Option<T> {
        let mut guard = self.driver.try_lock()?;
        Some(f(guard.as_mut()))
    }

    /// Run `f` with the driver, waiting for the lock.
    pub fn with_blocking<T>(&self, f: impl FnOnce(&mut dyn LedRing) -> T) -> T {
        let mut guard = self.driver.lock();
        f(guard.as_mut())
    }

    /// Record a color that the driver has fully applied.
    pub fn record(&self, color: Rgb) {
        self.snapshot.store(color.to_packed(), Ordering::SeqCst);
    }

    /// Last fully-written color. Never torn: the triple is stored as one word.
    pub fn snapshot(&self) -> Rgb {
        Rgb::from_packed(self.snapshot.load(Ordering::SeqCst))
    }
}

impl std::fmt::Debug for SharedRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRing")
            .field("snapshot", &self.snapshot())
            .field("locked", &self.driver.is_locked())
            .finish()
    }
}
