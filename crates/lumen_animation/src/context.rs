//! Per-store animation context
//!
//! An [`AnimationContext`] owns the clock and the loop for one store. Every
//! tween built from the same context shares them, so a store never runs more
//! than one frame loop.

use std::rc::Rc;

use lumen_core::{OnUnmount, Signal, Source, Store};

use crate::clock::FrameClock;
use crate::config::AnimationConfig;
use crate::error::Result;
use crate::frame_loop::AnimationLoop;
use crate::scheduler::FrameScheduler;
use crate::tween::Tween;

/// Clock, loop and defaults for the animations of one store
///
/// Dropping the context cancels the loop's outstanding frame registration.
pub struct AnimationContext {
    store: Store,
    clock: FrameClock,
    frame_loop: Rc<AnimationLoop>,
    config: AnimationConfig,
}

impl AnimationContext {
    /// Create a context with the default config
    pub fn new(store: &Store, scheduler: Rc<dyn FrameScheduler>) -> Self {
        Self::build(store, scheduler, AnimationConfig::default())
    }

    /// Create a context whose tweens default to `config`
    pub fn with_config(
        store: &Store,
        scheduler: Rc<dyn FrameScheduler>,
        config: AnimationConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(store, scheduler, config))
    }

    fn build(store: &Store, scheduler: Rc<dyn FrameScheduler>, config: AnimationConfig) -> Self {
        let tick = Signal::new(0.0).with_label("frame-tick");
        let frame_loop = AnimationLoop::new(scheduler.clone(), tick.clone(), store.downgrade());

        let subscription = Signal::new(()).with_label("animation-loop").with_on_mount({
            let frame_loop = frame_loop.clone();
            move |_store| {
                frame_loop.increment();
                let frame_loop = frame_loop.clone();
                let on_unmount: OnUnmount = Box::new(move |_: &Store| frame_loop.decrement());
                Some(on_unmount)
            }
        });

        tracing::debug!(
            duration_ms = config.duration_ms,
            target_fps = config.target_fps,
            "animation context created"
        );

        Self {
            store: store.clone(),
            clock: FrameClock::new(tick, subscription, scheduler),
            frame_loop,
            config,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    pub fn frame_loop(&self) -> &AnimationLoop {
        &self.frame_loop
    }

    /// Check if the loop is delivering frames
    pub fn is_running(&self) -> bool {
        self.frame_loop.is_running()
    }

    /// Number of mounted clock readers
    pub fn subscriber_count(&self) -> usize {
        self.frame_loop.subscriber_count()
    }

    /// Write the scheduler's current time into the clock
    ///
    /// Lets unsubscribed tweens advance: without a mounted reader the loop
    /// is idle and nothing else moves the clock.
    pub fn advance_frame(&self) {
        let now = self.clock.now();
        self.store
            .update(self.clock.tick_signal(), |previous| previous.max(now));
    }

    /// Start building a tween that follows `target`
    pub fn tween<S: Source<f64>>(&self, target: S) -> Tween<S> {
        Tween::new(self, target)
    }
}

impl Drop for AnimationContext {
    fn drop(&mut self) {
        self.frame_loop.shutdown();
    }
}

impl std::fmt::Debug for AnimationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationContext")
            .field("clock", &self.clock)
            .field("frame_loop", &self.frame_loop)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;
    use std::cell::RefCell;

    fn setup() -> (Store, Rc<ManualScheduler>, AnimationContext) {
        let store = Store::new();
        let scheduler = Rc::new(ManualScheduler::new());
        let ctx = AnimationContext::new(&store, scheduler.clone());
        (store, scheduler, ctx)
    }

    #[test]
    fn test_subscribing_to_clock_starts_loop() {
        let (store, scheduler, ctx) = setup();
        assert!(!ctx.is_running());

        let sub = store.subscribe(ctx.clock().signal(), || {});
        assert!(ctx.is_running());
        assert_eq!(scheduler.registration_count(), 1);

        sub.unsubscribe();
        assert!(!ctx.is_running());
    }

    #[test]
    fn test_one_registration_per_store() {
        let (store, scheduler, ctx) = setup();

        let a = store.subscribe(ctx.clock().signal(), || {});
        let b = store.subscribe(ctx.clock().signal(), || {});
        assert_eq!(scheduler.registration_count(), 1);

        a.unsubscribe();
        b.unsubscribe();
    }

    #[test]
    fn test_clock_follows_ticks() {
        let (store, scheduler, ctx) = setup();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sub = store.subscribe(ctx.clock().signal(), {
            let seen = seen.clone();
            let store = store.clone();
            let clock = ctx.clock().signal().clone();
            move || seen.borrow_mut().push(store.get(&clock))
        });

        scheduler.tick(599.0);
        scheduler.tick(600.0);
        assert_eq!(store.get(ctx.clock().signal()), 600.0);
        assert_eq!(*seen.borrow(), vec![599.0, 600.0]);

        sub.unsubscribe();
    }

    #[test]
    fn test_loop_idles_after_unsubscribe() {
        let (store, scheduler, ctx) = setup();

        let sub = store.subscribe(ctx.clock().signal(), || {});
        scheduler.tick(10.0);
        sub.unsubscribe();

        scheduler.tick(20.0);
        assert_eq!(scheduler.registration_count(), 0);
        assert_eq!(store.get(ctx.clock().tick_signal()), 10.0);
    }

    #[test]
    fn test_unmounted_read_sees_scheduler_time() {
        let (store, scheduler, ctx) = setup();
        scheduler.tick(500.0);
        assert_eq!(store.get(ctx.clock().signal()), 500.0);
    }

    #[test]
    fn test_unmounted_signal_waits_for_advance() {
        let (store, scheduler, ctx) = setup();
        scheduler.tick(500.0);
        assert_eq!(store.get(ctx.clock().signal()), 500.0);

        scheduler.tick(900.0);
        assert_eq!(store.get(ctx.clock().signal()), 500.0);
        assert_eq!(ctx.clock().peek(&store), 900.0);

        ctx.advance_frame();
        assert_eq!(store.get(ctx.clock().signal()), 900.0);
    }

    #[test]
    fn test_advance_frame() {
        let (store, scheduler, ctx) = setup();
        scheduler.tick(120.0);
        ctx.advance_frame();
        assert_eq!(store.get(ctx.clock().tick_signal()), 120.0);
    }

    #[test]
    fn test_contexts_are_independent() {
        let scheduler = Rc::new(ManualScheduler::new());
        let store_a = Store::new();
        let store_b = Store::new();
        let ctx_a = AnimationContext::new(&store_a, scheduler.clone());
        let ctx_b = AnimationContext::new(&store_b, scheduler.clone());

        let sub = store_a.subscribe(ctx_a.clock().signal(), || {});
        assert!(ctx_a.is_running());
        assert!(!ctx_b.is_running());
        sub.unsubscribe();
    }

    #[test]
    fn test_drop_cancels_registration() {
        let (store, scheduler, ctx) = setup();
        let sub = store.subscribe(ctx.clock().signal(), || {});
        assert_eq!(scheduler.registration_count(), 1);

        drop(ctx);
        assert_eq!(scheduler.registration_count(), 0);
        sub.unsubscribe();
    }

    #[test]
    fn test_with_config_validates() {
        let store = Store::new();
        let scheduler = Rc::new(ManualScheduler::new());
        let config = AnimationConfig {
            duration_ms: -1.0,
            ..AnimationConfig::default()
        };
        assert!(AnimationContext::with_config(&store, scheduler, config).is_err());
    }
}
