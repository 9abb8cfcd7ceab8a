//! Frame scheduling
//!
//! A [`FrameScheduler`] is the host's "call me before the next frame"
//! primitive. Callbacks are one-shot: a callback that wants the following
//! frame too must register itself again.
//!
//! Two implementations are provided:
//!
//! - [`ManualScheduler`]: frames are fired explicitly with
//!   [`ManualScheduler::tick`], used in tests and deterministic replays
//! - [`InstantScheduler`]: wall-clock timestamps, pumped by the host loop

use std::cell::{Cell, RefCell};
use std::fmt;
use std::time::{Duration, Instant};

use slotmap::{new_key_type, SlotMap};

use crate::error::{AnimationError, Result};

new_key_type! {
    /// Handle to a pending frame registration
    pub struct FrameHandle;
}

/// One-shot frame callback, called with the frame timestamp in milliseconds
pub type FrameCallback = Box<dyn FnOnce(f64)>;

/// Host frame scheduling primitive
pub trait FrameScheduler {
    /// Register `callback` for the next frame
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle;

    /// Cancel a pending registration
    ///
    /// Cancelling a handle that already fired is a no-op.
    fn cancel_frame(&self, handle: FrameHandle);

    /// Current timestamp in milliseconds
    fn now(&self) -> f64;
}

/// Pending one-shot callbacks
#[derive(Default)]
struct FrameRegistry {
    callbacks: RefCell<SlotMap<FrameHandle, FrameCallback>>,
}

impl FrameRegistry {
    fn register(&self, callback: FrameCallback) -> FrameHandle {
        self.callbacks.borrow_mut().insert(callback)
    }

    fn cancel(&self, handle: FrameHandle) {
        let removed = self.callbacks.borrow_mut().remove(handle);
        drop(removed);
    }

    fn len(&self) -> usize {
        self.callbacks.borrow().len()
    }

    /// Fire every callback registered before this call
    ///
    /// Callbacks registered while firing wait for the next frame. Slots are
    /// removed in place, so a fired handle never matches a later registration.
    fn fire(&self, timestamp: f64) -> usize {
        let due: Vec<FrameCallback> = {
            let mut callbacks = self.callbacks.borrow_mut();
            let handles: Vec<FrameHandle> = callbacks.keys().collect();
            handles
                .into_iter()
                .filter_map(|handle| callbacks.remove(handle))
                .collect()
        };
        let count = due.len();
        for callback in due {
            callback(timestamp);
        }
        count
    }
}

// ============================================================================
// Manual scheduler
// ============================================================================

/// Scheduler driven by explicit [`tick`](ManualScheduler::tick) calls
///
/// ```rust
/// use lumen_animation::{FrameScheduler, ManualScheduler};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let scheduler = ManualScheduler::new();
/// let seen = Rc::new(Cell::new(0.0));
/// let sink = seen.clone();
/// scheduler.request_frame(Box::new(move |ts| sink.set(ts)));
///
/// scheduler.tick(16.0);
/// assert_eq!(seen.get(), 16.0);
/// assert_eq!(scheduler.registration_count(), 0);
/// ```
#[derive(Default)]
pub struct ManualScheduler {
    registry: FrameRegistry,
    last_tick: Cell<f64>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance time to `timestamp` and fire the pending callbacks
    pub fn tick(&self, timestamp: f64) {
        self.last_tick.set(timestamp);
        let fired = self.registry.fire(timestamp);
        tracing::trace!(timestamp, fired, "manual frame");
    }

    /// Number of callbacks waiting for the next tick
    pub fn registration_count(&self) -> usize {
        self.registry.len()
    }

    /// Timestamp of the most recent tick
    pub fn last_tick(&self) -> f64 {
        self.last_tick.get()
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        self.registry.register(callback)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.registry.cancel(handle);
    }

    fn now(&self) -> f64 {
        self.last_tick.get()
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.registry.len())
            .field("last_tick", &self.last_tick.get())
            .finish()
    }
}

// ============================================================================
// Wall-clock scheduler
// ============================================================================

/// Scheduler using wall-clock time since its creation
///
/// The host calls [`pump`](InstantScheduler::pump) once per frame, or hands
/// control to [`run_until`](InstantScheduler::run_until) which pumps at a
/// fixed rate.
pub struct InstantScheduler {
    registry: FrameRegistry,
    origin: Instant,
    frames: Cell<u64>,
}

impl InstantScheduler {
    pub fn new() -> Self {
        Self {
            registry: FrameRegistry::default(),
            origin: Instant::now(),
            frames: Cell::new(0),
        }
    }

    /// Fire the pending callbacks with the current time
    ///
    /// Returns the number of callbacks fired.
    pub fn pump(&self) -> usize {
        let fired = self.registry.fire(self.now());
        if fired > 0 {
            self.frames.set(self.frames.get() + 1);
        }
        fired
    }

    /// Check if any callback waits for a frame
    pub fn has_pending(&self) -> bool {
        self.registry.len() > 0
    }

    /// Number of frames that fired at least one callback
    pub fn frame_count(&self) -> u64 {
        self.frames.get()
    }

    /// Pump frames at `target_fps` until `stop` returns true
    ///
    /// Blocks the calling thread between frames. Returns the number of
    /// frames pumped.
    pub fn run_until<F>(&self, target_fps: u32, mut stop: F) -> Result<u64>
    where
        F: FnMut() -> bool,
    {
        if target_fps == 0 {
            return Err(AnimationError::InvalidFps);
        }
        let frame_time = Duration::from_micros(1_000_000 / u64::from(target_fps));
        tracing::debug!(target_fps, "frame loop running");

        let mut pumped = 0u64;
        while !stop() {
            let frame_start = Instant::now();
            self.pump();
            pumped += 1;

            let elapsed = frame_start.elapsed();
            if elapsed < frame_time {
                std::thread::sleep(frame_time - elapsed);
            }
        }

        tracing::debug!(pumped, "frame loop stopped");
        Ok(pumped)
    }
}

impl Default for InstantScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScheduler for InstantScheduler {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        self.registry.register(callback)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.registry.cancel(handle);
    }

    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

impl fmt::Debug for InstantScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstantScheduler")
            .field("pending", &self.registry.len())
            .field("frames", &self.frames.get())
            .finish()
    }
}
