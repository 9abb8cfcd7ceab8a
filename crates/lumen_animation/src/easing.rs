//! Easing functions
//!
//! An easing maps linear progress in `[0, 1]` to eased progress. Presets
//! return `0` at `0` and `1` at `1`; the output in between may leave
//! `[0, 1]` (see [`Easing::EaseOutBack`]).

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Easing curve
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    #[default]
    Linear,
    /// Cubic ease-in
    EaseIn,
    /// Cubic ease-out
    EaseOut,
    /// Cubic ease-in-out
    EaseInOut,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    /// Overshoots the end slightly before settling
    EaseOutBack,
    /// User supplied curve
    #[serde(skip)]
    Custom(CustomEasing),
}

/// User supplied easing function
#[derive(Clone)]
pub struct CustomEasing(Rc<dyn Fn(f64) -> f64>);

impl fmt::Debug for CustomEasing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomEasing(..)")
    }
}

impl Easing {
    /// Wrap an arbitrary easing function
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(f64) -> f64 + 'static,
    {
        Easing::Custom(CustomEasing(Rc::new(f)))
    }

    /// Apply the curve to linear progress `t`
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Easing::Linear => t,
            Easing::EaseIn | Easing::EaseInCubic => t * t * t,
            Easing::EaseOut | Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOut | Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::EaseOutBack => {
                const C1: f64 = 1.70158;
                const C3: f64 = C1 + 1.0;
                1.0 + C3 * (t - 1.0).powi(3) + C1 * (t - 1.0).powi(2)
            }
            Easing::Custom(CustomEasing(f)) => f(t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRESETS: [Easing; 11] = [
        Easing::Linear,
        Easing::EaseIn,
        Easing::EaseOut,
        Easing::EaseInOut,
        Easing::EaseInQuad,
        Easing::EaseOutQuad,
        Easing::EaseInOutQuad,
        Easing::EaseInCubic,
        Easing::EaseOutCubic,
        Easing::EaseInOutCubic,
        Easing::EaseOutBack,
    ];

    #[test]
    fn test_presets_hit_endpoints() {
        for easing in &PRESETS {
            assert!(easing.apply(0.0).abs() < 1e-9, "{easing:?} at 0");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-9, "{easing:?} at 1");
        }
    }

    #[test]
    fn test_quad_values() {
        assert_eq!(Easing::EaseInQuad.apply(0.5), 0.25);
        assert_eq!(Easing::EaseOutQuad.apply(0.5), 0.75);
        assert_eq!(Easing::EaseInOutQuad.apply(0.5), 0.5);
    }

    #[test]
    fn test_back_overshoots() {
        let peak = (1..100)
            .map(|i| Easing::EaseOutBack.apply(i as f64 / 100.0))
            .fold(f64::MIN, f64::max);
        assert!(peak > 1.0);
    }

    #[test]
    fn test_custom() {
        let step = Easing::custom(|t| if t < 0.5 { 0.0 } else { 1.0 });
        assert_eq!(step.apply(0.25), 0.0);
        assert_eq!(step.apply(0.75), 1.0);
        assert_eq!(format!("{step:?}"), "Custom(CustomEasing(..))");
    }

    #[test]
    fn test_serde_names() {
        let easing: Easing = serde_json::from_str("\"ease_in_out_quad\"").unwrap();
        assert!(matches!(easing, Easing::EaseInOutQuad));
        assert_eq!(
            serde_json::to_string(&Easing::EaseOutBack).unwrap(),
            "\"ease_out_back\""
        );
        assert!(serde_json::to_string(&Easing::custom(|t| t)).is_err());
    }
}
