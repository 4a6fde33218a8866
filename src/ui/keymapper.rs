//! Key mapping for terminal input
//!
//! Converts crossterm key events into kernel `Key` values.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::core::key::{Key, KeyName, Modifiers};

impl From<KeyModifiers> for Modifiers {
    fn from(mods: KeyModifiers) -> Self {
        let mut result = Modifiers::empty();
        if mods.contains(KeyModifiers::SHIFT) {
            result |= Modifiers::SHIFT;
        }
        if mods.contains(KeyModifiers::CONTROL) {
            result |= Modifiers::CTRL;
        }
        if mods.contains(KeyModifiers::ALT) {
            result |= Modifiers::ALT;
        }
        result
    }
}

/// Key mapper for converting key events to `Key`
pub struct KeyMapper;

impl KeyMapper {
    /// Map a crossterm KeyEvent; None for releases and keys the kernel
    /// has no use for (media keys, lone modifiers, ...)
    pub fn map(event: &KeyEvent) -> Option<Key> {
        if event.kind == KeyEventKind::Release {
            return None;
        }

        let mut mods = Modifiers::from(event.modifiers);
        let (name, text) = match event.code {
            KeyCode::Char(ch) => (KeyName::Char, ch.to_string()),
            KeyCode::Enter => (KeyName::Enter, String::new()),
            KeyCode::Backspace => (KeyName::Backspace, String::new()),
            KeyCode::Tab => (KeyName::Tab, String::new()),
            KeyCode::BackTab => {
                mods |= Modifiers::SHIFT;
                (KeyName::Tab, String::new())
            }
            KeyCode::Esc => (KeyName::Escape, String::new()),
            KeyCode::Left => (KeyName::ArrowLeft, String::new()),
            KeyCode::Right => (KeyName::ArrowRight, String::new()),
            KeyCode::Up => (KeyName::ArrowUp, String::new()),
            KeyCode::Down => (KeyName::ArrowDown, String::new()),
            KeyCode::Home => (KeyName::Home, String::new()),
            KeyCode::End => (KeyName::End, String::new()),
            KeyCode::PageUp => (KeyName::PageUp, String::new()),
            KeyCode::PageDown => (KeyName::PageDown, String::new()),
            KeyCode::Insert => (KeyName::Insert, String::new()),
            KeyCode::Delete => (KeyName::Delete, String::new()),
            KeyCode::F(n) => (KeyName::F(n), String::new()),
            _ => return None,
        };

        Some(Key::new(name, text, mods))
    }

    /// Turn pasted text into keystrokes; line breaks become Enter
    pub fn map_paste(text: &str) -> Vec<Key> {
        text.replace("\r\n", "\n")
            .chars()
            .filter_map(|ch| match ch {
                '\r' | '\n' => Some(Key::named(KeyName::Enter)),
                '\t' => Some(Key::named(KeyName::Tab)),
                ch if ch.is_control() => None,
                ch => Some(Key::char(ch)),
            })
            .collect()
    }
}
