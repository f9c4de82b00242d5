//! Transition planning between two slideshow positions.
//!
//! The resolver decides whether a position change animates, which way it
//! travels, and the two keyframe tracks (outgoing and incoming image). It
//! does not schedule anything; a renderer samples the returned plan.

use std::time::Duration;

use crate::settings::AnimationStyle;

/// Length of every animated transition.
pub const TRANSITION_DURATION: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Recorded once per position change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionIntent {
    pub previous: Option<usize>,
    pub current: usize,
    pub is_forward: bool,
}

impl TransitionIntent {
    pub fn new(previous: Option<usize>, current: usize, len: usize) -> Self {
        let is_forward = previous.is_some_and(|prev| is_forward(prev, current, len));
        Self {
            previous,
            current,
            is_forward,
        }
    }

    pub fn direction(&self) -> Direction {
        if self.is_forward {
            Direction::Forward
        } else {
            Direction::Backward
        }
    }
}

/// Last-to-first counts as forward and first-to-last as backward; anything
/// else compares numerically, including multi-step jumps.
pub fn is_forward(previous: usize, current: usize, len: usize) -> bool {
    let last = len.saturating_sub(1);
    let wrapped_to_start = current == 0 && previous == last;
    let wrapped_to_end = previous == 0 && current == last;
    (current > previous || wrapped_to_start) && !wrapped_to_end
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Translation {
    Px(f32),
    /// Percentage of the container width.
    Percent(f32),
}

impl Translation {
    fn lerp(self, to: Self, t: f32) -> Self {
        match (self, to) {
            (Self::Px(a), Self::Px(b)) => Self::Px(a + (b - a) * t),
            (Self::Percent(a), Self::Percent(b)) => Self::Percent(a + (b - a) * t),
            // Tracks are always built in a single unit.
            (_, to) => to,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub translate_x: Translation,
    pub opacity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframes {
    pub from: Keyframe,
    pub to: Keyframe,
}

impl Keyframes {
    /// Interpolate at linear progress `t` (clamped to `0..=1`) after easing.
    pub fn sample(&self, t: f32, easing: Easing) -> Keyframe {
        let eased = easing.apply(t.clamp(0.0, 1.0));
        Keyframe {
            translate_x: self.from.translate_x.lerp(self.to.translate_x, eased),
            opacity: self.from.opacity + (self.to.opacity - self.from.opacity) * eased,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    /// CSS `ease-in-out`, i.e. `cubic-bezier(0.42, 0, 0.58, 1)`.
    EaseInOut,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        match self {
            Self::EaseInOut => cubic_bezier(0.42, 0.0, 0.58, 1.0, t),
        }
    }
}

fn cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32, t: f32) -> f32 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    let curve = |p1: f32, p2: f32, s: f32| {
        let inv = 1.0 - s;
        3.0 * inv * inv * s * p1 + 3.0 * inv * s * s * p2 + s * s * s
    };

    // Bisection on x(s) = t; x is monotonic for control points in [0, 1].
    let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
    let mut s = t;
    for _ in 0..32 {
        let x = curve(x1, x2, s);
        if (x - t).abs() < 1e-6 {
            break;
        }
        if x < t {
            lo = s;
        } else {
            hi = s;
        }
        s = 0.5 * (lo + hi);
    }
    curve(y1, y2, s)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatedTransition {
    pub style: AnimationStyle,
    pub direction: Direction,
    pub outgoing: Keyframes,
    pub incoming: Keyframes,
    pub duration: Duration,
    pub easing: Easing,
}

impl AnimatedTransition {
    /// Outgoing and incoming frames `elapsed` into the transition.
    pub fn frames_at(&self, elapsed: Duration) -> (Keyframe, Keyframe) {
        let t = if self.duration.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
        };
        (
            self.outgoing.sample(t, self.easing),
            self.incoming.sample(t, self.easing),
        )
    }

    pub fn is_finished(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransitionPlan {
    /// Swap images without animating.
    Immediate,
    Animated(AnimatedTransition),
}

impl TransitionPlan {
    pub fn is_animated(&self) -> bool {
        matches!(self, Self::Animated(_))
    }
}

/// Plan the transition for a position change from `previous` to `current`.
///
/// `container_width` is the rendered width in pixels when known; otherwise
/// slides travel a full container width expressed as a percentage.
pub fn resolve_transition(
    previous: Option<usize>,
    current: usize,
    len: usize,
    style: Option<AnimationStyle>,
    container_width: Option<f32>,
) -> TransitionPlan {
    let (Some(previous), Some(style)) = (previous, style) else {
        return TransitionPlan::Immediate;
    };
    let intent = TransitionIntent::new(Some(previous), current, len);
    plan_for(&intent, style, container_width)
}

/// Same as [`resolve_transition`] for an intent the session already recorded.
pub fn plan_for(
    intent: &TransitionIntent,
    style: AnimationStyle,
    container_width: Option<f32>,
) -> TransitionPlan {
    if intent.previous.is_none() {
        return TransitionPlan::Immediate;
    }
    let direction = intent.direction();
    let (outgoing, incoming) = match style {
        AnimationStyle::Fade => fade_tracks(),
        AnimationStyle::Slide => slide_tracks(direction, container_width, false),
        AnimationStyle::SlideFade => slide_tracks(direction, container_width, true),
    };
    TransitionPlan::Animated(AnimatedTransition {
        style,
        direction,
        outgoing,
        incoming,
        duration: TRANSITION_DURATION,
        easing: Easing::EaseInOut,
    })
}

fn fade_tracks() -> (Keyframes, Keyframes) {
    let still = Translation::Percent(0.0);
    (
        Keyframes {
            from: Keyframe {
                translate_x: still,
                opacity: 1.0,
            },
            to: Keyframe {
                translate_x: still,
                opacity: 0.0,
            },
        },
        Keyframes {
            from: Keyframe {
                translate_x: still,
                opacity: 0.0,
            },
            to: Keyframe {
                translate_x: still,
                opacity: 1.0,
            },
        },
    )
}

fn slide_tracks(
    direction: Direction,
    container_width: Option<f32>,
    fade: bool,
) -> (Keyframes, Keyframes) {
    let offset = |amount: f32| match container_width.filter(|w| w.is_finite() && *w > 0.0) {
        Some(width) => Translation::Px(amount * width),
        None => Translation::Percent(amount * 100.0),
    };
    // Forward: the incoming image enters from the right, the outgoing leaves left.
    let sign = match direction {
        Direction::Forward => 1.0,
        Direction::Backward => -1.0,
    };
    let hidden_opacity = if fade { 0.0 } else { 1.0 };

    let outgoing = Keyframes {
        from: Keyframe {
            translate_x: offset(0.0),
            opacity: 1.0,
        },
        to: Keyframe {
            translate_x: offset(-sign),
            opacity: hidden_opacity,
        },
    };
    let incoming = Keyframes {
        from: Keyframe {
            translate_x: offset(sign),
            opacity: hidden_opacity,
        },
        to: Keyframe {
            translate_x: offset(0.0),
            opacity: 1.0,
        },
    };
    (outgoing, incoming)
}
