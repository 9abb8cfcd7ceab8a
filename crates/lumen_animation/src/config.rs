//! Animation defaults
//!
//! Loaded from TOML:
//!
//! ```toml
//! duration_ms = 250
//! easing = "ease_out_quad"
//! target_fps = 120
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::easing::Easing;
use crate::error::{AnimationError, Result};

/// Defaults applied to tweens built from a context
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnimationConfig {
    /// Tween duration in milliseconds
    pub duration_ms: f64,
    /// Tween easing curve
    pub easing: Easing,
    /// Frame rate used by [`InstantScheduler::run_until`](crate::InstantScheduler::run_until)
    pub target_fps: u32,
}

impl AnimationConfig {
    pub const DEFAULT_DURATION_MS: f64 = 300.0;
    pub const DEFAULT_TARGET_FPS: u32 = 60;

    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_duration(self.duration_ms)?;
        if self.target_fps == 0 {
            return Err(AnimationError::InvalidFps);
        }
        Ok(())
    }

    /// Time budget of one frame at `target_fps`
    pub fn frame_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.target_fps.max(1)))
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            duration_ms: Self::DEFAULT_DURATION_MS,
            easing: Easing::Linear,
            target_fps: Self::DEFAULT_TARGET_FPS,
        }
    }
}

pub(crate) fn validate_duration(duration_ms: f64) -> Result<f64> {
    if duration_ms.is_finite() && duration_ms > 0.0 {
        Ok(duration_ms)
    } else {
        tracing::warn!(duration_ms, "rejected tween duration");
        Err(AnimationError::InvalidDuration(duration_ms))
    }
}
