//! Reference-counted animation loop
//!
//! The loop runs while at least one consumer needs per-frame clock updates.
//! Consumers are counted through [`LoopState`], whose transitions are pure so
//! the start/stop logic can be checked without a scheduler. The
//! [`AnimationLoop`] applies those transitions to a [`FrameScheduler`].
//!
//! Every start hands out a fresh [`LoopToken`]. A frame callback only writes
//! the clock and re-registers itself while its token is current, so a loop
//! that stops and restarts within one frame never ends up with two live
//! callbacks.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use lumen_core::{Signal, WeakStore};
use smallvec::SmallVec;

use crate::scheduler::{FrameHandle, FrameScheduler};

/// Identifies one run of the loop
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LoopToken(u64);

impl LoopToken {
    /// The generation this token was issued for
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// Effect of a count change
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopTransition {
    /// The first consumer arrived; start a run with this token
    Start(LoopToken),
    /// The last consumer left; the run with this token is over
    Stop(LoopToken),
    /// The loop keeps its current state
    Unchanged,
}

/// Consumer count and current generation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopState {
    count: usize,
    generation: u64,
}

impl LoopState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self) -> LoopTransition {
        self.count += 1;
        if self.count == 1 {
            self.generation += 1;
            LoopTransition::Start(LoopToken(self.generation))
        } else {
            LoopTransition::Unchanged
        }
    }

    /// Decrementing at zero is a no-op
    pub fn decrement(&mut self) -> LoopTransition {
        match self.count {
            0 => LoopTransition::Unchanged,
            1 => {
                self.count = 0;
                let token = LoopToken(self.generation);
                self.generation += 1;
                LoopTransition::Stop(token)
            }
            _ => {
                self.count -= 1;
                LoopTransition::Unchanged
            }
        }
    }

    /// Check if `token` belongs to the run in progress
    pub fn is_current(&self, token: LoopToken) -> bool {
        self.count > 0 && token.0 == self.generation
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_running(&self) -> bool {
        self.count > 0
    }
}

/// Per-store animation loop
///
/// Writes each frame's timestamp into the clock's tick signal for as long as
/// the consumer count stays above zero.
pub struct AnimationLoop {
    state: Cell<LoopState>,
    pending: RefCell<SmallVec<[(LoopToken, FrameHandle); 2]>>,
    closed: Cell<bool>,
    scheduler: Rc<dyn FrameScheduler>,
    tick: Signal<f64>,
    store: WeakStore,
}

impl AnimationLoop {
    pub(crate) fn new(
        scheduler: Rc<dyn FrameScheduler>,
        tick: Signal<f64>,
        store: WeakStore,
    ) -> Rc<Self> {
        Rc::new(Self {
            state: Cell::new(LoopState::new()),
            pending: RefCell::new(SmallVec::new()),
            closed: Cell::new(false),
            scheduler,
            tick,
            store,
        })
    }

    /// Register a consumer, starting the loop if it was idle
    pub fn increment(self: &Rc<Self>) {
        if let LoopTransition::Start(token) = self.transition(LoopState::increment) {
            tracing::debug!(generation = token.generation(), "animation loop started");
            self.request(token);
        }
    }

    /// Release a consumer, stopping the loop when none remain
    ///
    /// The pending frame callback is left registered; it fires once more,
    /// sees its stale token and exits.
    pub fn decrement(&self) {
        if let LoopTransition::Stop(token) = self.transition(LoopState::decrement) {
            tracing::debug!(generation = token.generation(), "animation loop stopped");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.get().count()
    }

    pub fn is_running(&self) -> bool {
        self.state.get().is_running()
    }

    /// Number of frame registrations this loop still has outstanding
    pub fn pending_frames(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Cancel outstanding registrations and refuse new ones
    pub(crate) fn shutdown(&self) {
        self.closed.set(true);
        let pending: SmallVec<[(LoopToken, FrameHandle); 2]> =
            self.pending.borrow_mut().drain(..).collect();
        for (_, handle) in pending {
            self.scheduler.cancel_frame(handle);
        }
    }

    fn transition(&self, f: impl FnOnce(&mut LoopState) -> LoopTransition) -> LoopTransition {
        let mut state = self.state.get();
        let transition = f(&mut state);
        self.state.set(state);
        transition
    }

    fn request(self: &Rc<Self>, token: LoopToken) {
        if self.closed.get() {
            return;
        }
        let this: Weak<Self> = Rc::downgrade(self);
        let handle = self.scheduler.request_frame(Box::new(move |timestamp| {
            if let Some(this) = this.upgrade() {
                this.on_frame(token, timestamp);
            }
        }));
        self.pending.borrow_mut().push((token, handle));
    }

    fn on_frame(self: &Rc<Self>, token: LoopToken, timestamp: f64) {
        self.pending.borrow_mut().retain(|(t, _)| *t != token);

        if !self.state.get().is_current(token) {
            tracing::trace!(generation = token.generation(), "stale frame callback");
            return;
        }

        if let Some(store) = self.store.upgrade() {
            store.update(&self.tick, |previous| previous.max(timestamp));
        }

        // Writing the clock can settle every tween and stop the loop.
        if self.state.get().is_current(token) {
            self.request(token);
        }
    }
}

impl fmt::Debug for AnimationLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationLoop")
            .field("state", &self.state.get())
            .field("pending", &self.pending.borrow().len())
            .field("closed", &self.closed.get())
            .finish()
    }
}
