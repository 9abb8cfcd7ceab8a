//! Lumen Animation System
//!
//! Frame-driven animation on top of the [`lumen_core`] store.
//!
//! # Features
//!
//! - **Frame Clock**: a reactive timestamp fed by a [`FrameScheduler`]
//! - **Animation Loop**: one per store, running only while something reads
//!   the clock
//! - **Tweens**: derived values that ease towards a numeric target
//! - **Easing**: presets plus custom curves
//! - **Config**: TOML-loadable tween defaults
//!
//! # Example
//!
//! ```rust
//! use lumen_animation::{tweened, AnimationContext, Easing, ManualScheduler};
//! use lumen_core::{Signal, Store};
//! use std::rc::Rc;
//!
//! let store = Store::new();
//! let scheduler = Rc::new(ManualScheduler::new());
//! let ctx = AnimationContext::new(&store, scheduler.clone());
//!
//! let opacity = Signal::new(0.0);
//! let faded = tweened(&ctx, opacity.clone(), Easing::EaseInQuad, 300.0).unwrap();
//!
//! let sub = store.subscribe(&faded, || {});
//! store.set(&opacity, 1.0);
//! assert!(ctx.is_running());
//!
//! for ts in [100.0, 200.0, 300.0, 400.0] {
//!     scheduler.tick(ts);
//! }
//! assert_eq!(store.get(&faded), 1.0);
//! assert!(!ctx.is_running());
//! sub.unsubscribe();
//! ```

pub mod clock;
pub mod config;
pub mod context;
pub mod easing;
pub mod error;
pub mod frame_loop;
pub mod scheduler;
pub mod tween;

pub use clock::FrameClock;
pub use config::AnimationConfig;
pub use context::AnimationContext;
pub use easing::{CustomEasing, Easing};
pub use error::{AnimationError, Result};
pub use frame_loop::{AnimationLoop, LoopState, LoopToken, LoopTransition};
pub use scheduler::{FrameCallback, FrameHandle, FrameScheduler, InstantScheduler, ManualScheduler};
pub use tween::{progress, tweened, OnComplete, OnStart, Settle, Tween, TweenState, TweenTransition};
