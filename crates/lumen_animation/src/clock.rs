//! Frame clock
//!
//! A reactive millisecond timestamp. Reading it from a derived computation
//! subscribes that computation to the animation loop for as long as it is
//! mounted; once the computation stops reading the clock the loop's consumer
//! count drops again.

use std::fmt;
use std::rc::Rc;

use lumen_core::{Derived, Getter, Signal, Store};

use crate::scheduler::FrameScheduler;

/// Reactive frame timestamp shared by every tween of a context
#[derive(Clone)]
pub struct FrameClock {
    tick: Signal<f64>,
    subscription: Signal<()>,
    signal: Derived<f64>,
    scheduler: Rc<dyn FrameScheduler>,
}

impl FrameClock {
    pub(crate) fn new(
        tick: Signal<f64>,
        subscription: Signal<()>,
        scheduler: Rc<dyn FrameScheduler>,
    ) -> Self {
        let signal = Derived::new({
            let tick = tick.clone();
            let subscription = subscription.clone();
            let scheduler = scheduler.clone();
            move |get| read_clock(get, &tick, &subscription, scheduler.as_ref())
        })
        .with_label("frame-clock");

        Self {
            tick,
            subscription,
            signal,
            scheduler,
        }
    }

    /// Read the clock and keep the loop running while the reader is mounted
    ///
    /// Returns the later of the last frame timestamp and the scheduler's
    /// current time, so a reader that wakes up after the loop went idle sees
    /// the present rather than the last frame.
    pub fn read(&self, get: &Getter<'_>) -> f64 {
        read_clock(get, &self.tick, &self.subscription, self.scheduler.as_ref())
    }

    /// The same reading as [`read`](FrameClock::read) without recording a
    /// dependency, so it neither mounts the loop nor keeps it running
    pub fn peek(&self, store: &Store) -> f64 {
        store.get(&self.tick).max(self.scheduler.now())
    }

    /// The clock as a subscribable derived value
    ///
    /// The value is cached like any derived value and only moves when a
    /// frame is written. While nothing is subscribed the loop is idle, so
    /// repeated reads return the same timestamp until
    /// [`AnimationContext::advance_frame`](crate::AnimationContext::advance_frame)
    /// writes a new one. Use [`peek`](FrameClock::peek) for the present.
    pub fn signal(&self) -> &Derived<f64> {
        &self.signal
    }

    /// The raw frame timestamp written by the loop
    pub fn tick_signal(&self) -> &Signal<f64> {
        &self.tick
    }

    /// Current scheduler time, untracked
    pub fn now(&self) -> f64 {
        self.scheduler.now()
    }
}

fn read_clock(
    get: &Getter<'_>,
    tick: &Signal<f64>,
    subscription: &Signal<()>,
    scheduler: &dyn FrameScheduler,
) -> f64 {
    let tick = get.get(tick);
    get.get(subscription);
    tick.max(scheduler.now())
}

impl fmt::Debug for FrameClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameClock")
            .field("tick", &self.tick)
            .field("now", &self.scheduler.now())
            .finish()
    }
}
