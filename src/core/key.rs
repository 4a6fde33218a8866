//! Keystroke values
//!
//! A `Key` is produced once per physical keystroke and never mutated. Besides
//! the logical name and text payload it carries `code`, the VT byte sequence
//! a terminal would send for the same keystroke.

use bitflags::bitflags;

bitflags! {
    /// Modifier keys
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
    }
}

/// Logical key name
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyName {
    /// Any key producing text (letters, digits, punctuation, space)
    Char,
    Enter,
    Backspace,
    Delete,
    Tab,
    Escape,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    F(u8),
    /// Something the kernel has no name for
    Other(String),
}

/// A single keystroke
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Key {
    code: Vec<u8>,
    text: String,
    name: KeyName,
    mods: Modifiers,
}

impl Key {
    pub fn new(name: KeyName, text: impl Into<String>, mods: Modifiers) -> Self {
        let text = text.into();
        let code = encode(&name, &text, mods);
        Self { code, text, name, mods }
    }

    /// A plain character key
    pub fn char(ch: char) -> Self {
        Self::new(KeyName::Char, ch.to_string(), Modifiers::empty())
    }

    /// A named key without text
    pub fn named(name: KeyName) -> Self {
        Self::new(name, String::new(), Modifiers::empty())
    }

    /// Same key with `mods` added
    pub fn with_mods(self, mods: Modifiers) -> Self {
        Self::new(self.name, self.text, self.mods | mods)
    }

    /// VT byte sequence for this keystroke
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Text payload; may hold several chars for composed input
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn name(&self) -> &KeyName {
        &self.name
    }

    pub fn mods(&self) -> Modifiers {
        self.mods
    }

    pub fn ctrl(&self) -> bool {
        self.mods.contains(Modifiers::CTRL)
    }

    pub fn alt(&self) -> bool {
        self.mods.contains(Modifiers::ALT)
    }

    pub fn shift(&self) -> bool {
        self.mods.contains(Modifiers::SHIFT)
    }

    /// The single printable char this key carries, if any
    pub fn printable(&self) -> Option<char> {
        let mut chars = self.text.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if !ch.is_control() => Some(ch),
            _ => None,
        }
    }
}

/// Encode a key as the bytes a VT terminal would send
fn encode(name: &KeyName, text: &str, mods: Modifiers) -> Vec<u8> {
    match name {
        KeyName::Char => encode_text(text, mods),
        KeyName::Enter => vec![0x0D],
        KeyName::Backspace => {
            if mods.contains(Modifiers::ALT) {
                vec![0x1B, 0x7F]
            } else {
                vec![0x7F]
            }
        }
        KeyName::Tab => {
            if mods.contains(Modifiers::SHIFT) {
                b"\x1b[Z".to_vec()
            } else {
                vec![0x09]
            }
        }
        KeyName::Escape => vec![0x1B],
        KeyName::ArrowUp => csi_final(b'A', mods),
        KeyName::ArrowDown => csi_final(b'B', mods),
        KeyName::ArrowRight => csi_final(b'C', mods),
        KeyName::ArrowLeft => csi_final(b'D', mods),
        KeyName::Home => csi_final(b'H', mods),
        KeyName::End => csi_final(b'F', mods),
        KeyName::Insert => tilde_key(2, mods),
        KeyName::Delete => tilde_key(3, mods),
        KeyName::PageUp => tilde_key(5, mods),
        KeyName::PageDown => tilde_key(6, mods),
        KeyName::F(n) => function_key(*n, mods),
        KeyName::Other(_) => text.as_bytes().to_vec(),
    }
}

/// Text with modifiers
fn encode_text(text: &str, mods: Modifiers) -> Vec<u8> {
    let mut chars = text.chars();
    let single = match (chars.next(), chars.next()) {
        (Some(ch), None) => Some(ch),
        _ => None,
    };

    if let Some(ch) = single {
        // Ctrl + letter = control character
        if mods.contains(Modifiers::CTRL) && ch.is_ascii_alphabetic() {
            let ctrl_code = (ch.to_ascii_lowercase() as u8) - b'a' + 1;
            if mods.contains(Modifiers::ALT) {
                return vec![0x1B, ctrl_code];
            }
            return vec![ctrl_code];
        }
        if mods.contains(Modifiers::CTRL) && !mods.contains(Modifiers::ALT) {
            match ch {
                '@' | '`' | ' ' => return vec![0x00],
                '[' => return vec![0x1B],
                '\\' => return vec![0x1C],
                ']' => return vec![0x1D],
                '^' | '~' => return vec![0x1E],
                '_' | '?' => return vec![0x1F],
                _ => {}
            }
        }
    }

    // Alt + key = ESC + key
    if mods.contains(Modifiers::ALT) && !mods.contains(Modifiers::CTRL) {
        let mut bytes = vec![0x1B];
        bytes.extend(text.as_bytes());
        return bytes;
    }

    text.as_bytes().to_vec()
}

/// `ESC [ <key>` or `ESC [ 1 ; <mod> <key>`
fn csi_final(key: u8, mods: Modifiers) -> Vec<u8> {
    if mods.is_empty() {
        vec![0x1B, b'[', key]
    } else {
        format!("\x1b[1;{}{}", modifier_code(mods), key as char).into_bytes()
    }
}

/// `ESC [ <code> ~` with optional modifier
fn tilde_key(code: u8, mods: Modifiers) -> Vec<u8> {
    if mods.is_empty() {
        format!("\x1b[{}~", code).into_bytes()
    } else {
        format!("\x1b[{};{}~", code, modifier_code(mods)).into_bytes()
    }
}

fn function_key(n: u8, mods: Modifiers) -> Vec<u8> {
    let tilde = match n {
        1..=4 => {
            let key = b"PQRS"[(n - 1) as usize];
            if mods.is_empty() {
                return vec![0x1B, b'O', key];
            }
            return format!("\x1b[1;{}{}", modifier_code(mods), key as char).into_bytes();
        }
        5 => 15,
        6 => 17,
        7 => 18,
        8 => 19,
        9 => 20,
        10 => 21,
        11 => 23,
        12 => 24,
        _ => return vec![],
    };
    tilde_key(tilde, mods)
}

/// xterm modifier parameter
fn modifier_code(mods: Modifiers) -> u8 {
    1 + if mods.contains(Modifiers::SHIFT) { 1 } else { 0 }
        + if mods.contains(Modifiers::ALT) { 2 } else { 0 }
        + if mods.contains(Modifiers::CTRL) { 4 } else { 0 }
}
