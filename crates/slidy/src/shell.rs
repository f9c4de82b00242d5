//! Presentation shell helpers: keyboard shortcuts, pointer inactivity and
//! fullscreen state. None of these own slideshow state; they translate input
//! into session calls.

use std::time::Duration;

use tokio::time::Instant;

/// Pointer idle time after which controls are hidden.
pub const DEFAULT_POINTER_INACTIVITY: Duration = Duration::from_millis(2500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowRight,
    ArrowLeft,
    ArrowUp,
    ArrowDown,
    Space,
    Char(char),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };

    fn any_non_shift(&self) -> bool {
        self.ctrl || self.alt || self.meta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub modifiers: Modifiers,
    /// Focus is inside a text input, select or similar control.
    pub in_text_entry: bool,
}

impl KeyPress {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
            in_text_entry: false,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn in_text_entry(mut self) -> Self {
        self.in_text_entry = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellAction {
    /// Relative move from the current position.
    Step(i64),
    ToggleFullscreen,
    ToggleAutoplay,
}

/// Map a key press to a slideshow action.
pub fn dispatch_key(press: &KeyPress) -> Option<ShellAction> {
    if press.in_text_entry {
        return None;
    }
    match press.key {
        Key::ArrowRight | Key::ArrowDown => Some(ShellAction::Step(1)),
        Key::ArrowLeft | Key::ArrowUp => Some(ShellAction::Step(-1)),
        Key::Space if press.modifiers.shift => Some(ShellAction::Step(-1)),
        Key::Space => Some(ShellAction::Step(1)),
        Key::Char('f') if !press.modifiers.any_non_shift() => Some(ShellAction::ToggleFullscreen),
        Key::Char('p') if !press.modifiers.any_non_shift() => Some(ShellAction::ToggleAutoplay),
        Key::Char(_) => None,
    }
}

/// Tracks whether the pointer has been idle long enough to hide controls.
#[derive(Debug, Clone, Copy)]
pub struct PointerActivity {
    timeout: Duration,
    last_move: Instant,
}

impl PointerActivity {
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            last_move: now,
        }
    }

    pub fn on_move(&mut self, now: Instant) {
        self.last_move = now;
    }

    pub fn is_inactive(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_move) >= self.timeout
    }

    /// When the pointer will count as inactive if it does not move again.
    /// `None` when the timeout is too large to represent; controls then stay
    /// visible.
    pub fn inactive_at(&self) -> Option<Instant> {
        self.last_move.checked_add(self.timeout)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fullscreen {
    active: bool,
}

impl Fullscreen {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn toggle(&mut self) -> bool {
        self.active = !self.active;
        self.active
    }

    pub fn exit(&mut self) {
        self.active = false;
    }
}
