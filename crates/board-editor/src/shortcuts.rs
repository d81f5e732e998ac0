//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s so every host
//! shares one keymap:
//! - Tab toggles between the two most recent tools
//! - Shift constrains (axis lock, square, 15° rotation)
//! - ⌘/Ctrl combos drive history, clipboard and z-order

use crate::input::Modifiers;
use crate::tools::ToolKind;

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Tool switching ──
    Tool(ToolKind),
    ToggleLastTool,

    // ── Edit ──
    Undo,
    Redo,
    Delete,
    SelectAll,
    Duplicate,
    Copy,
    Cut,
    Paste,

    // ── View ──
    ZoomIn,
    ZoomOut,
    ZoomReset,

    // ── Z-order ──
    SendBackward,
    BringForward,
    SendToBack,
    BringToFront,

    /// Cancel the active gesture, or clear the selection when idle.
    Escape,
}

/// Resolves key events into shortcut actions.
///
/// `meta` (⌘) and `ctrl` are treated alike so one map serves every
/// platform.
pub struct ShortcutMap;

impl ShortcutMap {
    /// `key` is the DOM `KeyboardEvent.key` value (`"z"`, `"Delete"`, ...).
    pub fn resolve(key: &str, mods: Modifiers) -> Option<ShortcutAction> {
        let cmd = mods.command();

        // ── Modifier combos first (most specific) ──
        if cmd && mods.shift {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Redo),
                "[" | "{" => Some(ShortcutAction::SendToBack),
                "]" | "}" => Some(ShortcutAction::BringToFront),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Undo),
                "y" | "Y" => Some(ShortcutAction::Redo),
                "a" | "A" => Some(ShortcutAction::SelectAll),
                "d" | "D" => Some(ShortcutAction::Duplicate),
                "c" | "C" => Some(ShortcutAction::Copy),
                "x" | "X" => Some(ShortcutAction::Cut),
                "v" | "V" => Some(ShortcutAction::Paste),
                "=" | "+" => Some(ShortcutAction::ZoomIn),
                "-" => Some(ShortcutAction::ZoomOut),
                "0" => Some(ShortcutAction::ZoomReset),
                "[" => Some(ShortcutAction::SendBackward),
                "]" => Some(ShortcutAction::BringForward),
                _ => None,
            };
        }

        // Escape and delete work regardless of shift.
        match key {
            "Escape" => return Some(ShortcutAction::Escape),
            "Delete" | "Backspace" => return Some(ShortcutAction::Delete),
            _ => {}
        }
        if mods.shift || mods.alt {
            return None;
        }

        // ── Single keys (no modifiers) ──
        let tool = match key {
            "v" | "V" => ToolKind::Select,
            "r" | "R" => ToolKind::Rectangle,
            "o" | "O" => ToolKind::Ellipse,
            "g" | "G" => ToolKind::Triangle,
            "s" | "S" => ToolKind::Star,
            "t" | "T" => ToolKind::Text,
            "n" | "N" => ToolKind::StickyNote,
            "b" | "B" => ToolKind::Table,
            "f" | "F" => ToolKind::Section,
            "p" | "P" => ToolKind::Pen,
            "c" | "C" | "l" | "L" => ToolKind::Connector,
            "Tab" => return Some(ShortcutAction::ToggleLastTool),
            _ => return None,
        };
        Some(ShortcutAction::Tool(tool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: Modifiers = Modifiers::NONE;
    const CMD: Modifiers = Modifiers::CTRL;
    const META: Modifiers = Modifiers {
        meta: true,
        ..Modifiers::NONE
    };
    const CMD_SHIFT: Modifiers = Modifiers {
        ctrl: true,
        shift: true,
        ..Modifiers::NONE
    };

    #[test]
    fn resolve_tool_shortcuts() {
        assert_eq!(
            ShortcutMap::resolve("v", NONE),
            Some(ShortcutAction::Tool(ToolKind::Select))
        );
        assert_eq!(
            ShortcutMap::resolve("R", NONE),
            Some(ShortcutAction::Tool(ToolKind::Rectangle))
        );
        assert_eq!(
            ShortcutMap::resolve("f", NONE),
            Some(ShortcutAction::Tool(ToolKind::Section))
        );
        assert_eq!(
            ShortcutMap::resolve("p", NONE),
            Some(ShortcutAction::Tool(ToolKind::Pen))
        );
        assert_eq!(
            ShortcutMap::resolve("l", NONE),
            Some(ShortcutAction::Tool(ToolKind::Connector))
        );
    }

    #[test]
    fn resolve_tab_toggles_tool() {
        assert_eq!(
            ShortcutMap::resolve("Tab", NONE),
            Some(ShortcutAction::ToggleLastTool)
        );
    }

    #[test]
    fn resolve_undo_redo() {
        assert_eq!(ShortcutMap::resolve("z", CMD), Some(ShortcutAction::Undo));
        assert_eq!(ShortcutMap::resolve("z", META), Some(ShortcutAction::Undo));
        assert_eq!(ShortcutMap::resolve("Z", CMD_SHIFT), Some(ShortcutAction::Redo));
        assert_eq!(ShortcutMap::resolve("y", CMD), Some(ShortcutAction::Redo));
    }

    #[test]
    fn resolve_delete_and_escape_ignore_shift() {
        assert_eq!(ShortcutMap::resolve("Delete", NONE), Some(ShortcutAction::Delete));
        assert_eq!(
            ShortcutMap::resolve("Backspace", Modifiers::SHIFT),
            Some(ShortcutAction::Delete)
        );
        assert_eq!(
            ShortcutMap::resolve("Escape", Modifiers::SHIFT),
            Some(ShortcutAction::Escape)
        );
    }

    #[test]
    fn resolve_z_order() {
        assert_eq!(ShortcutMap::resolve("[", CMD), Some(ShortcutAction::SendBackward));
        assert_eq!(ShortcutMap::resolve("]", CMD), Some(ShortcutAction::BringForward));
        assert_eq!(ShortcutMap::resolve("[", CMD_SHIFT), Some(ShortcutAction::SendToBack));
        assert_eq!(ShortcutMap::resolve("]", CMD_SHIFT), Some(ShortcutAction::BringToFront));
    }

    #[test]
    fn resolve_clipboard() {
        assert_eq!(ShortcutMap::resolve("c", CMD), Some(ShortcutAction::Copy));
        assert_eq!(ShortcutMap::resolve("x", CMD), Some(ShortcutAction::Cut));
        assert_eq!(ShortcutMap::resolve("v", CMD), Some(ShortcutAction::Paste));
        assert_eq!(ShortcutMap::resolve("d", CMD), Some(ShortcutAction::Duplicate));
        assert_eq!(ShortcutMap::resolve("a", CMD), Some(ShortcutAction::SelectAll));
    }

    #[test]
    fn resolve_modifier_precedence() {
        // ⌘V pastes; plain V picks the select tool.
        assert_ne!(
            ShortcutMap::resolve("v", CMD),
            ShortcutMap::resolve("v", NONE)
        );
        assert_eq!(ShortcutMap::resolve("r", Modifiers::SHIFT), None);
        assert_eq!(ShortcutMap::resolve("r", Modifiers::ALT), None);
    }

    #[test]
    fn resolve_zoom() {
        assert_eq!(ShortcutMap::resolve("=", CMD), Some(ShortcutAction::ZoomIn));
        assert_eq!(ShortcutMap::resolve("+", CMD), Some(ShortcutAction::ZoomIn));
        assert_eq!(ShortcutMap::resolve("-", CMD), Some(ShortcutAction::ZoomOut));
        assert_eq!(ShortcutMap::resolve("0", CMD), Some(ShortcutAction::ZoomReset));
    }

    #[test]
    fn resolve_unknown_key() {
        assert_eq!(ShortcutMap::resolve("q", NONE), None);
        assert_eq!(ShortcutMap::resolve("q", CMD), None);
        assert_eq!(ShortcutMap::resolve("F13", NONE), None);
    }
}
