//! Tweened values
//!
//! A tween follows a numeric target. When the target changes, the tween
//! moves from its current value to the new target over a fixed duration,
//! shaped by an [`Easing`], and exposes the moving value as a [`Derived`].
//!
//! ```rust
//! use lumen_animation::{AnimationContext, Easing, ManualScheduler};
//! use lumen_core::{Signal, Store};
//! use std::rc::Rc;
//!
//! let store = Store::new();
//! let scheduler = Rc::new(ManualScheduler::new());
//! let ctx = AnimationContext::new(&store, scheduler.clone());
//!
//! let target = Signal::new(0.0);
//! let value = ctx.tween(target.clone())
//!     .easing(Easing::Linear)
//!     .duration_ms(200.0)
//!     .build()
//!     .unwrap();
//!
//! let sub = store.subscribe(&value, || {});
//! store.set(&target, 10.0);
//! scheduler.tick(100.0);
//! assert_eq!(store.get(&value), 5.0);
//! scheduler.tick(200.0);
//! assert_eq!(store.get(&value), 10.0);
//! sub.unsubscribe();
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use lumen_core::{Derived, Getter, Source, Store};

use crate::clock::FrameClock;
use crate::config::{validate_duration, AnimationConfig};
use crate::context::AnimationContext;
use crate::easing::Easing;
use crate::error::Result;

/// Called when a tween starts moving, with its start and end values
pub type OnStart = Rc<dyn Fn(&Getter<'_>, f64, f64)>;

/// Called once when a tween reaches its end value
pub type OnComplete = Rc<dyn Fn(&Getter<'_>, &mut Settle)>;

/// Compare with NaN equal to itself
pub(crate) fn same_value(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

/// Linear progress of a tween, clamped to `[0, 1]`
pub fn progress(now: f64, start_time: f64, duration_ms: f64) -> f64 {
    ((now - start_time) / duration_ms).clamp(0.0, 1.0)
}

/// Where a tween stands
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TweenState {
    /// At rest at the last observed target
    Settled(f64),
    /// Moving from `start` to `end`, started at `start_time`
    InFlight { start: f64, end: f64, start_time: f64 },
}

/// Event produced by a [`TweenState::step`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TweenTransition {
    Started { start: f64, end: f64 },
    Completed { value: f64 },
}

impl TweenState {
    /// The value this state reports without reading the clock
    pub fn value(&self) -> f64 {
        match *self {
            TweenState::Settled(value) => value,
            TweenState::InFlight { start, .. } => start,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, TweenState::Settled(_))
    }

    /// Advance the state for the observed `target`
    ///
    /// `clock` is only called when the answer depends on time: a settled
    /// state whose target did not change never reads it.
    pub fn step<C>(
        &mut self,
        target: f64,
        clock: C,
        duration_ms: f64,
        easing: &Easing,
    ) -> (f64, Option<TweenTransition>)
    where
        C: FnOnce() -> f64,
    {
        match *self {
            TweenState::Settled(value) => {
                if same_value(value, target) {
                    return (value, None);
                }
                *self = TweenState::InFlight {
                    start: value,
                    end: target,
                    start_time: clock(),
                };
                (
                    value,
                    Some(TweenTransition::Started {
                        start: value,
                        end: target,
                    }),
                )
            }
            TweenState::InFlight {
                start,
                end,
                start_time,
            } => {
                let now = clock();
                let factor = progress(now, start_time, duration_ms);
                let current = if factor >= 1.0 {
                    end
                } else {
                    start + (end - start) * easing.apply(factor)
                };

                if !same_value(end, target) {
                    *self = TweenState::InFlight {
                        start: current,
                        end: target,
                        start_time: now,
                    };
                    return (
                        current,
                        Some(TweenTransition::Started {
                            start: current,
                            end: target,
                        }),
                    );
                }

                if factor >= 1.0 {
                    *self = TweenState::Settled(end);
                    return (end, Some(TweenTransition::Completed { value: end }));
                }

                (current, None)
            }
        }
    }
}

/// Handed to [`OnComplete`] callbacks
///
/// Lets the callback replace the value the tween settles at.
#[derive(Debug)]
pub struct Settle {
    value: f64,
}

impl Settle {
    /// The end value the tween reached
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Settle at `value` instead
    pub fn set(&mut self, value: f64) {
        self.value = value;
    }
}

/// Builder for a tweened [`Derived`]
pub struct Tween<S> {
    store: Store,
    clock: FrameClock,
    target: S,
    easing: Easing,
    duration_ms: f64,
    on_start: Option<OnStart>,
    on_complete: Option<OnComplete>,
    label: Option<String>,
}

impl<S: Source<f64>> Tween<S> {
    /// Follow `target` using the context's default easing and duration
    pub fn new(ctx: &AnimationContext, target: S) -> Self {
        let config = ctx.config();
        Self {
            store: ctx.store().clone(),
            clock: ctx.clock().clone(),
            target,
            easing: config.easing.clone(),
            duration_ms: config.duration_ms,
            on_start: None,
            on_complete: None,
            label: None,
        }
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Take easing and duration from `config`
    pub fn config(mut self, config: &AnimationConfig) -> Self {
        self.easing = config.easing.clone();
        self.duration_ms = config.duration_ms;
        self
    }

    pub fn on_start<F>(mut self, f: F) -> Self
    where
        F: Fn(&Getter<'_>, f64, f64) + 'static,
    {
        self.on_start = Some(Rc::new(f));
        self
    }

    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: Fn(&Getter<'_>, &mut Settle) + 'static,
    {
        self.on_complete = Some(Rc::new(f));
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Build the tweened value
    ///
    /// The tween starts settled at the target's current value in the
    /// context's store. Its state belongs to that store: reading it from
    /// any other store yields the target unanimated.
    pub fn build(self) -> Result<Derived<f64>> {
        let duration_ms = validate_duration(self.duration_ms)?;
        let Tween {
            store,
            clock,
            target,
            easing,
            on_start,
            on_complete,
            label,
            ..
        } = self;

        let home = store.downgrade();
        let state = Rc::new(RefCell::new(TweenState::Settled(store.get(&target))));

        let derived = Derived::new(move |get| {
            let observed = get.get(&target);
            if !home.refers_to(get.store()) {
                return observed;
            }

            let now = || clock.peek(get.store());
            let (mut value, mut transition) =
                state
                    .borrow_mut()
                    .step(observed, &now, duration_ms, &easing);

            if let Some(TweenTransition::Completed { value: end }) = transition {
                tracing::trace!(value = end, "tween settled");
                transition = None;
                if let Some(on_complete) = &on_complete {
                    let mut settle = Settle { value: end };
                    on_complete(get, &mut settle);
                    if !same_value(settle.value, end) {
                        // Settling away from the target restarts toward it
                        let mut state = state.borrow_mut();
                        *state = TweenState::Settled(settle.value);
                        (value, transition) = state.step(observed, &now, duration_ms, &easing);
                    }
                }
            }

            if let Some(TweenTransition::Started { start, end }) = transition {
                tracing::trace!(start, end, "tween started");
                if let Some(on_start) = &on_start {
                    on_start(get, start, end);
                }
            }

            // Only a moving tween depends on the clock, so settling releases
            // the loop in the same frame
            if !state.borrow().is_settled() {
                clock.read(get);
            }
            value
        });

        Ok(match label {
            Some(label) => derived.with_label(label),
            None => derived,
        })
    }
}

/// Tween `target` with the given easing and duration
pub fn tweened<S: Source<f64>>(
    ctx: &AnimationContext,
    target: S,
    easing: Easing,
    duration_ms: f64,
) -> Result<Derived<f64>> {
    Tween::new(ctx, target)
        .easing(easing)
        .duration_ms(duration_ms)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock_at(now: f64) -> impl FnOnce() -> f64 {
        move || now
    }

    #[test]
    fn test_settled_ignores_clock() {
        let mut state = TweenState::Settled(3.0);
        let (value, transition) = state.step(
            3.0,
            || panic!("clock read while settled"),
            300.0,
            &Easing::Linear,
        );
        assert_eq!(value, 3.0);
        assert_eq!(transition, None);
    }

    #[test]
    fn test_target_change_starts() {
        let mut state = TweenState::Settled(0.0);
        let (value, transition) = state.step(3.0, clock_at(50.0), 300.0, &Easing::Linear);
        assert_eq!(value, 0.0);
        assert_eq!(
            transition,
            Some(TweenTransition::Started {
                start: 0.0,
                end: 3.0
            })
        );
        assert_eq!(
            state,
            TweenState::InFlight {
                start: 0.0,
                end: 3.0,
                start_time: 50.0
            }
        );
    }

    #[test]
    fn test_interpolates_and_completes() {
        let mut state = TweenState::Settled(0.0);
        state.step(3.0, clock_at(0.0), 300.0, &Easing::Linear);

        assert_eq!(state.step(3.0, clock_at(100.0), 300.0, &Easing::Linear), (1.0, None));
        assert_eq!(state.step(3.0, clock_at(200.0), 300.0, &Easing::Linear), (2.0, None));
        assert_eq!(
            state.step(3.0, clock_at(300.0), 300.0, &Easing::Linear),
            (3.0, Some(TweenTransition::Completed { value: 3.0 }))
        );
        assert_eq!(state, TweenState::Settled(3.0));
    }

    #[test]
    fn test_overshoot_snaps_to_end() {
        let mut state = TweenState::Settled(0.0);
        state.step(1.0, clock_at(0.0), 300.0, &Easing::EaseOutBack);
        let (value, transition) = state.step(1.0, clock_at(10_000.0), 300.0, &Easing::EaseOutBack);
        assert_eq!(value, 1.0);
        assert!(matches!(transition, Some(TweenTransition::Completed { .. })));
    }

    #[test]
    fn test_retarget_starts_from_current() {
        let mut state = TweenState::Settled(0.0);
        state.step(4.0, clock_at(0.0), 400.0, &Easing::Linear);

        let (value, transition) = state.step(0.0, clock_at(100.0), 400.0, &Easing::Linear);
        assert_eq!(value, 1.0);
        assert_eq!(
            transition,
            Some(TweenTransition::Started {
                start: 1.0,
                end: 0.0
            })
        );
        assert_eq!(
            state,
            TweenState::InFlight {
                start: 1.0,
                end: 0.0,
                start_time: 100.0
            }
        );
    }

    #[test]
    fn test_clock_before_start_clamps() {
        let mut state = TweenState::Settled(0.0);
        state.step(2.0, clock_at(100.0), 200.0, &Easing::Linear);
        assert_eq!(state.step(2.0, clock_at(50.0), 200.0, &Easing::Linear), (0.0, None));
    }

    #[test]
    fn test_nan_target_settles() {
        let mut state = TweenState::Settled(f64::NAN);
        let (value, transition) = state.step(f64::NAN, || panic!("clock read"), 300.0, &Easing::Linear);
        assert!(value.is_nan());
        assert_eq!(transition, None);
    }

    #[test]
    fn test_progress() {
        assert_eq!(progress(150.0, 100.0, 100.0), 0.5);
        assert_eq!(progress(50.0, 100.0, 100.0), 0.0);
        assert_eq!(progress(500.0, 100.0, 100.0), 1.0);
    }
}
