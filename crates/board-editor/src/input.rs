//! Input abstraction layer.
//!
//! Normalizes mouse, touch and stylus events into a single `InputEvent`
//! enum. Pointer coordinates arrive in screen space; the dispatcher maps
//! them to world space before tools see them.

/// Keyboard modifier state at the time of an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ..Modifiers::NONE
    };

    pub const ALT: Modifiers = Modifiers {
        alt: true,
        ..Modifiers::NONE
    };

    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };

    /// Platform command key: ⌘ on macOS, Ctrl elsewhere.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// A normalized input event from any device.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed (mouse down, touch start, pencil contact).
    PointerDown {
        x: f64,
        y: f64,
        /// 0.0 (none) to 1.0 (max). Mouse is always 1.0.
        pressure: f64,
        modifiers: Modifiers,
        time_ms: u64,
    },

    PointerMove {
        x: f64,
        y: f64,
        pressure: f64,
        modifiers: Modifiers,
        time_ms: u64,
    },

    PointerUp {
        x: f64,
        y: f64,
        modifiers: Modifiers,
        time_ms: u64,
    },

    /// Scroll wheel or trackpad; ctrl/meta turns it into zoom.
    Wheel {
        x: f64,
        y: f64,
        dx: f64,
        dy: f64,
        modifiers: Modifiers,
    },

    Key { key: String, modifiers: Modifiers },

    /// The host surface changed size (screen pixels).
    ViewportResized { width: f64, height: f64 },
}

impl InputEvent {
    pub fn pointer_down(x: f64, y: f64) -> Self {
        Self::PointerDown {
            x,
            y,
            pressure: 1.0,
            modifiers: Modifiers::NONE,
            time_ms: 0,
        }
    }

    pub fn pointer_move(x: f64, y: f64) -> Self {
        Self::PointerMove {
            x,
            y,
            pressure: 1.0,
            modifiers: Modifiers::NONE,
            time_ms: 0,
        }
    }

    pub fn pointer_up(x: f64, y: f64) -> Self {
        Self::PointerUp {
            x,
            y,
            modifiers: Modifiers::NONE,
            time_ms: 0,
        }
    }

    pub fn key(key: &str) -> Self {
        Self::Key {
            key: key.to_string(),
            modifiers: Modifiers::NONE,
        }
    }

    pub fn wheel(x: f64, y: f64, dx: f64, dy: f64) -> Self {
        Self::Wheel {
            x,
            y,
            dx,
            dy,
            modifiers: Modifiers::NONE,
        }
    }

    /// Same event with different modifiers (no-op for resize).
    pub fn with_modifiers(mut self, mods: Modifiers) -> Self {
        match &mut self {
            Self::PointerDown { modifiers, .. }
            | Self::PointerMove { modifiers, .. }
            | Self::PointerUp { modifiers, .. }
            | Self::Wheel { modifiers, .. }
            | Self::Key { modifiers, .. } => *modifiers = mods,
            Self::ViewportResized { .. } => {}
        }
        self
    }

    /// Same event with a timestamp (pointer events only).
    pub fn at_time(mut self, t: u64) -> Self {
        match &mut self {
            Self::PointerDown { time_ms, .. }
            | Self::PointerMove { time_ms, .. }
            | Self::PointerUp { time_ms, .. } => *time_ms = t,
            _ => {}
        }
        self
    }

    /// Position if this is a pointer event.
    pub fn position(&self) -> Option<(f64, f64)> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y, .. } => Some((*x, *y)),
            _ => None,
        }
    }

    /// Replace the position of a pointer event (screen → world mapping).
    pub fn with_position(mut self, nx: f64, ny: f64) -> Self {
        match &mut self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y, .. } => {
                *x = nx;
                *y = ny;
            }
            _ => {}
        }
        self
    }

    pub fn modifiers(&self) -> Modifiers {
        match self {
            Self::PointerDown { modifiers, .. }
            | Self::PointerMove { modifiers, .. }
            | Self::PointerUp { modifiers, .. }
            | Self::Wheel { modifiers, .. }
            | Self::Key { modifiers, .. } => *modifiers,
            Self::ViewportResized { .. } => Modifiers::NONE,
        }
    }

    pub fn time_ms(&self) -> u64 {
        match self {
            Self::PointerDown { time_ms, .. }
            | Self::PointerMove { time_ms, .. }
            | Self::PointerUp { time_ms, .. } => *time_ms,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_set_fields() {
        let ev = InputEvent::pointer_move(3.0, 4.0)
            .with_modifiers(Modifiers::SHIFT)
            .at_time(42);
        assert_eq!(ev.position(), Some((3.0, 4.0)));
        assert!(ev.modifiers().shift);
        assert_eq!(ev.time_ms(), 42);
    }

    #[test]
    fn command_covers_ctrl_and_meta() {
        assert!(Modifiers::CTRL.command());
        let meta = Modifiers {
            meta: true,
            ..Modifiers::NONE
        };
        assert!(meta.command());
        assert!(!Modifiers::SHIFT.command());
    }

    #[test]
    fn non_pointer_has_no_position() {
        assert_eq!(InputEvent::key("Escape").position(), None);
        let moved = InputEvent::key("a").with_position(1.0, 1.0);
        assert_eq!(moved, InputEvent::key("a"));
    }
}
