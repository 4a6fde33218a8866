//! Readline-style line editing and the shell built on it

use unicode_width::UnicodeWidthChar;

use crate::core::key::{Key, KeyName};
use crate::history::{History, HISTORY_LIMIT};

use super::program::Hooks;
use super::state::ProcessState;

/// Editable text with a cursor.
///
/// `cursor` is a char index and always satisfies `0 <= cursor <= len`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    text: Vec<char>,
    cursor: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer holding `text` with the cursor clamped into range
    pub fn with_text(text: &str, cursor: usize) -> Self {
        let mut line = Self {
            text: text.chars().collect(),
            cursor,
        };
        line.clamp();
        line
    }

    fn clamp(&mut self) {
        self.cursor = self.cursor.min(self.text.len());
    }

    pub fn text(&self) -> String {
        self.text.iter().collect()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn at_end(&self) -> bool {
        self.cursor == self.text.len()
    }

    /// Insert at the cursor and advance past it
    pub fn insert(&mut self, ch: char) {
        self.text.insert(self.cursor, ch);
        self.cursor += 1;
        self.clamp();
    }

    /// Remove the char before the cursor
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.text.remove(self.cursor - 1);
        self.cursor -= 1;
        self.clamp();
        true
    }

    /// Remove the char under the cursor
    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.text.len() {
            return false;
        }
        self.text.remove(self.cursor);
        self.clamp();
        true
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor += 1;
        self.clamp();
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.text.len();
    }

    /// Skip left to the previous word boundary
    pub fn word_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let mut x = self.cursor - 1;
        while x > 0 && is_word_char(self.text[x - 1]) {
            x -= 1;
        }
        self.cursor = x;
    }

    /// Skip right to the next word boundary
    pub fn word_right(&mut self) {
        if self.cursor >= self.text.len() {
            return;
        }
        let mut x = self.cursor + 1;
        while x < self.text.len() && is_word_char(self.text[x - 1]) {
            x += 1;
        }
        self.cursor = x;
    }

    /// Replace the contents, cursor at the end
    pub fn set(&mut self, text: &str) {
        self.text = text.chars().collect();
        self.cursor = self.text.len();
    }

    /// Take the contents, leaving the buffer empty
    pub fn take(&mut self) -> String {
        let text = self.text();
        self.text.clear();
        self.cursor = 0;
        text
    }

    /// Display width of the text before the cursor
    pub fn width_before_cursor(&self) -> usize {
        self.text[..self.cursor].iter().map(|c| char_width(*c)).sum()
    }

    /// Display width of the whole text
    pub fn width(&self) -> usize {
        self.text.iter().map(|c| char_width(*c)).sum()
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
}

fn char_width(ch: char) -> usize {
    ch.width().unwrap_or(0)
}

fn str_width(text: &str) -> usize {
    text.chars().map(char_width).sum()
}

fn column(width: usize) -> u16 {
    u16::try_from(width).unwrap_or(u16::MAX)
}

/// Shell settings
#[derive(Debug, Clone)]
pub struct ShellOptions {
    pub prompt: String,
    pub history_limit: usize,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self {
            prompt: "> ".to_string(),
            history_limit: HISTORY_LIMIT,
        }
    }
}

/// Line-editing shell.
///
/// Edits one line at a time, keeps a history of committed lines and runs
/// them: a few builtins, everything else goes to `exec`.
pub struct Shell {
    api: Option<ProcessState>,
    options: ShellOptions,
    line: LineBuffer,
    history: History,
    /// Index into history while browsing with the arrow keys
    recall: Option<usize>,
    /// The in-progress line saved when browsing starts
    draft: String,
    /// A child we launched has the terminal
    waiting: bool,
    /// The prompt for the current line reached the terminal
    prompted: bool,
    exiting: bool,
}

impl Shell {
    pub fn new(options: ShellOptions) -> Self {
        let history = History::with_limit(options.history_limit);
        Self {
            api: None,
            options,
            line: LineBuffer::new(),
            history,
            recall: None,
            draft: String::new(),
            waiting: false,
            prompted: false,
            exiting: false,
        }
    }

    pub fn line(&self) -> &LineBuffer {
        &self.line
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn prompt(&self) -> &str {
        &self.options.prompt
    }

    fn prompt_width(&self) -> usize {
        str_width(&self.options.prompt)
    }

    /// Terminal column of the logical cursor
    fn cursor_column(&self) -> u16 {
        column(self.prompt_width() + self.line.width_before_cursor())
    }

    fn write(&self, text: &str) {
        if let Some(api) = &self.api {
            api.write(text);
        }
    }

    fn set_cursor_x(&self, x: u16) {
        if let Some(api) = &self.api {
            api.set_cursor_x(x);
        }
    }

    fn hide_cursor(&self) {
        if let Some(api) = &self.api {
            api.hide_cursor();
        }
    }

    fn show_cursor(&self) {
        if let Some(api) = &self.api {
            api.show_cursor();
        }
    }

    /// Start a fresh line
    fn write_prompt(&mut self) {
        self.line = LineBuffer::new();
        self.recall = None;
        self.resume_line();
    }

    /// Write the prompt and whatever is already in the buffer
    fn resume_line(&mut self) {
        self.hide_cursor();
        self.write(&self.options.prompt);
        if !self.line.is_empty() {
            self.write(&self.line.text());
            if !self.line.at_end() {
                self.set_cursor_x(self.cursor_column());
            }
        }
        self.show_cursor();
        self.prompted = self.api.as_ref().is_some_and(ProcessState::is_enabled);
    }

    /// Rewrite the line after the prompt, `padding` blanks past its end
    fn redraw(&self, padding: usize) {
        self.hide_cursor();
        self.set_cursor_x(column(self.prompt_width()));
        self.write(&format!("{}{}", self.line.text(), " ".repeat(padding)));
        self.set_cursor_x(self.cursor_column());
        self.show_cursor();
    }

    /// Redraw after an edit; `old_width` is the line's width before it
    fn refresh_line(&self, old_width: usize) {
        self.redraw(old_width.saturating_sub(self.line.width()).max(1));
    }

    /// Cursor movement and deletion keys; false if `key` is not one
    fn key_position_command(&mut self, key: &Key) -> bool {
        match key.name() {
            KeyName::ArrowLeft if key.alt() => self.line.word_left(),
            KeyName::ArrowRight if key.alt() => self.line.word_right(),
            KeyName::ArrowLeft => self.line.move_left(),
            KeyName::ArrowRight => self.line.move_right(),
            KeyName::Home => self.line.home(),
            KeyName::End => self.line.end(),
            KeyName::Backspace => {
                let old_width = self.line.width();
                if self.line.backspace() {
                    self.refresh_line(old_width);
                }
                return true;
            }
            KeyName::Delete => {
                let old_width = self.line.width();
                if self.line.delete() {
                    self.refresh_line(old_width);
                }
                return true;
            }
            _ => return false,
        }
        self.set_cursor_x(self.cursor_column());
        true
    }

    /// History browsing keys; false if `key` is not one
    fn key_history_command(&mut self, key: &Key) -> bool {
        let old_width = self.line.width();
        let next = match key.name() {
            KeyName::ArrowUp => match self.recall {
                None if self.history.is_empty() => return true,
                None => {
                    self.draft = self.line.text();
                    Some(self.history.len() - 1)
                }
                Some(0) => return true,
                Some(i) => Some(i - 1),
            },
            KeyName::ArrowDown => match self.recall {
                None => return true,
                Some(i) if i + 1 < self.history.len() => Some(i + 1),
                Some(_) => None,
            },
            _ => return false,
        };

        self.recall = next;
        let text = match next {
            Some(i) => self.history.get(i).unwrap_or_default().to_string(),
            None => std::mem::take(&mut self.draft),
        };
        self.line.set(&text);
        let padding = old_width.saturating_sub(self.line.width()) + 1;
        self.redraw(padding);
        true
    }

    fn insert(&mut self, ch: char) {
        if self.line.at_end() {
            self.line.insert(ch);
            self.write(&ch.to_string());
        } else {
            let old_width = self.line.width();
            self.line.insert(ch);
            self.refresh_line(old_width);
        }
    }

    /// Commit the current line and run it
    fn commit(&mut self) {
        self.write("\r\n");
        let line = self.line.take();
        self.recall = None;
        self.draft.clear();
        tracing::info!(pid = self.api.as_ref().map(ProcessState::pid), line = %line, "line committed");
        self.history.add(&line);
        self.run(&line);
        if !self.waiting && !self.exiting {
            self.write_prompt();
        }
    }

    fn run(&mut self, line: &str) {
        let args: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        let Some(api) = self.api.clone() else { return };

        match args.first().map(String::as_str) {
            None => {}
            Some("clear") => api.clear(),
            Some("exit") => {
                self.exiting = true;
                api.exit();
            }
            Some("history") => {
                for (i, entry) in self.history.iter().enumerate() {
                    api.write(&format!("{:>4}  {}\r\n", i + 1, entry));
                }
            }
            Some(_) => match api.exec(&args) {
                Ok(()) => self.waiting = true,
                Err(e) => api.write(&format!("{}\r\n", e)),
            },
        }
    }
}

impl Hooks for Shell {
    fn on_start(&mut self, api: ProcessState) {
        self.api = Some(api);
        self.write_prompt();
    }

    fn on_end(&mut self) {
        // Leave the terminal on a fresh row if a line was half typed
        if !self.line.is_empty() {
            self.write("\r\n");
        }
        tracing::debug!(pid = self.api.as_ref().map(ProcessState::pid), "shell ended");
    }

    fn on_focus(&mut self, focused: bool) {
        if self.exiting {
            return;
        }
        if !focused {
            // Someone else owns the terminal until we get it back
            self.prompted = false;
        } else if self.waiting {
            self.waiting = false;
            self.write_prompt();
        } else if !self.prompted {
            self.resume_line();
        }
    }

    fn on_key(&mut self, key: &Key) {
        if *key.name() == KeyName::Enter {
            self.commit();
            return;
        }

        if self.key_position_command(key) || self.key_history_command(key) {
            return;
        }

        if key.alt() || key.ctrl() {
            return;
        }

        let Some(ch) = key.printable() else {
            tracing::debug!(text = key.text(), "ignoring non-printable key");
            return;
        };
        self.insert(ch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::core::bus::{EventBus, Message, TerminalCommand, PROCESS_TOPIC, TERMINAL_TOPIC};
    use crate::core::key::Modifiers;
    use crate::proc::stream::StreamTable;

    #[test]
    fn test_backspace_at_end() {
        let mut line = LineBuffer::with_text("hello", 5);
        assert!(line.backspace());
        assert_eq!(line.text(), "hell");
        assert_eq!(line.cursor(), 4);
    }

    #[test]
    fn test_backspace_at_start_is_noop() {
        let mut line = LineBuffer::with_text("abc", 0);
        assert!(!line.backspace());
        assert_eq!(line.text(), "abc");
        assert_eq!(line.cursor(), 0);
    }

    #[test]
    fn test_delete_keeps_cursor() {
        let mut line = LineBuffer::with_text("abc", 1);
        assert!(line.delete());
        assert_eq!(line.text(), "ac");
        assert_eq!(line.cursor(), 1);

        line.end();
        assert!(!line.delete());
    }

    #[test]
    fn test_word_left_to_start_of_word() {
        let mut line = LineBuffer::with_text("hello world", 11);
        line.word_left();
        assert_eq!(line.cursor(), 6);
        line.word_left();
        // From just after the space: steps over it, then back through "hello"
        assert_eq!(line.cursor(), 0);
    }

    #[test]
    fn test_word_right() {
        let mut line = LineBuffer::with_text("hello world", 0);
        line.word_right();
        assert_eq!(line.cursor(), 6);
        line.word_right();
        assert_eq!(line.cursor(), 11);
        line.word_right();
        assert_eq!(line.cursor(), 11);
    }

    #[test]
    fn test_arrow_left_clamps() {
        let mut line = LineBuffer::new();
        line.move_left();
        assert_eq!(line.cursor(), 0);
        line.move_right();
        assert_eq!(line.cursor(), 0);
    }

    #[test]
    fn test_insert_mid_line() {
        let mut line = LineBuffer::with_text("ab", 1);
        line.insert('x');
        assert_eq!(line.text(), "axb");
        assert_eq!(line.cursor(), 2);
    }

    #[test]
    fn test_with_text_clamps_cursor() {
        let line = LineBuffer::with_text("ab", 9);
        assert_eq!(line.cursor(), 2);
    }

    #[test]
    fn test_wide_chars_width() {
        let line = LineBuffer::with_text("a日b", 2);
        assert_eq!(line.width_before_cursor(), 3);
        assert_eq!(line.width(), 4);
    }

    #[derive(Default)]
    struct Screen {
        commands: Vec<TerminalCommand>,
    }

    impl Screen {
        fn record(&mut self, message: &Message) {
            if let Message::Terminal(command) = message {
                self.commands.push(command.clone());
            }
        }
    }

    /// A started, enabled shell wired to a recording screen
    fn shell_with_screen(prompt: &str) -> (Rc<EventBus>, Rc<RefCell<Screen>>, Shell) {
        let bus = Rc::new(EventBus::new());
        bus.register(TERMINAL_TOPIC).unwrap();
        bus.register(PROCESS_TOPIC).unwrap();
        let screen = Rc::new(RefCell::new(Screen::default()));
        bus.subscribe(TERMINAL_TOPIC, "screen", &screen, Screen::record).unwrap();

        let api = ProcessState::new(0, bus.clone(), Rc::new(RefCell::new(StreamTable::new())));
        api.enable();
        let mut shell = Shell::new(ShellOptions {
            prompt: prompt.to_string(),
            ..ShellOptions::default()
        });
        shell.on_start(api);
        bus.run_until_idle();
        screen.borrow_mut().commands.clear();
        (bus, screen, shell)
    }

    fn type_str(shell: &mut Shell, text: &str) {
        for ch in text.chars() {
            shell.on_key(&Key::char(ch));
        }
    }

    fn write(text: &str) -> TerminalCommand {
        TerminalCommand::Write(text.to_string())
    }

    #[test]
    fn test_typing_at_end_echoes() {
        let (bus, screen, mut shell) = shell_with_screen("$ ");
        type_str(&mut shell, "hi");
        bus.run_until_idle();
        assert_eq!(screen.borrow().commands, vec![write("h"), write("i")]);
    }

    #[test]
    fn test_backspace_redraws_line() {
        let (bus, screen, mut shell) = shell_with_screen("$ ");
        type_str(&mut shell, "abc");
        shell.on_key(&Key::named(KeyName::ArrowLeft));
        shell.on_key(&Key::named(KeyName::Backspace));
        bus.run_until_idle();

        assert_eq!(shell.line().text(), "ac");
        assert_eq!(shell.line().cursor(), 1);
        assert_eq!(
            screen.borrow().commands[3..],
            [
                TerminalCommand::SetCursorX(4),
                TerminalCommand::HideCursor,
                TerminalCommand::SetCursorX(2),
                write("ac "),
                TerminalCommand::SetCursorX(3),
                TerminalCommand::ShowCursor,
            ]
        );
    }

    #[test]
    fn test_insert_mid_line_redraws() {
        let (bus, screen, mut shell) = shell_with_screen("$ ");
        type_str(&mut shell, "ac");
        shell.on_key(&Key::named(KeyName::ArrowLeft));
        shell.on_key(&Key::char('b'));
        bus.run_until_idle();

        assert_eq!(shell.line().text(), "abc");
        assert_eq!(shell.line().cursor(), 2);
        assert_eq!(
            screen.borrow().commands[3..],
            [
                TerminalCommand::HideCursor,
                TerminalCommand::SetCursorX(2),
                write("abc "),
                TerminalCommand::SetCursorX(4),
                TerminalCommand::ShowCursor,
            ]
        );
    }

    #[test]
    fn test_delete_redraws_line() {
        let (bus, screen, mut shell) = shell_with_screen("$ ");
        type_str(&mut shell, "abc");
        shell.on_key(&Key::named(KeyName::Home));
        shell.on_key(&Key::named(KeyName::Delete));
        bus.run_until_idle();

        assert_eq!(shell.line().text(), "bc");
        assert_eq!(shell.line().cursor(), 0);
        assert_eq!(
            screen.borrow().commands[4..],
            [
                TerminalCommand::HideCursor,
                TerminalCommand::SetCursorX(2),
                write("bc "),
                TerminalCommand::SetCursorX(2),
                TerminalCommand::ShowCursor,
            ]
        );
    }

    #[test]
    fn test_delete_wide_char_blanks_both_columns() {
        let (bus, screen, mut shell) = shell_with_screen("");
        type_str(&mut shell, "日a");
        shell.on_key(&Key::named(KeyName::Home));
        shell.on_key(&Key::named(KeyName::Delete));
        bus.run_until_idle();

        assert_eq!(shell.line().text(), "a");
        assert_eq!(
            screen.borrow().commands[3..],
            [
                TerminalCommand::HideCursor,
                TerminalCommand::SetCursorX(0),
                write("a  "),
                TerminalCommand::SetCursorX(0),
                TerminalCommand::ShowCursor,
            ]
        );
    }

    #[test]
    fn test_backspace_wide_char_blanks_both_columns() {
        let (bus, screen, mut shell) = shell_with_screen("");
        type_str(&mut shell, "a日b");
        shell.on_key(&Key::named(KeyName::ArrowLeft));
        shell.on_key(&Key::named(KeyName::Backspace));
        bus.run_until_idle();

        assert_eq!(shell.line().text(), "ab");
        let screen = screen.borrow();
        let commands = &screen.commands;
        assert_eq!(commands[commands.len() - 3], write("ab  "));
        assert_eq!(commands[commands.len() - 2], TerminalCommand::SetCursorX(1));
    }

    #[test]
    fn test_alt_arrow_skips_words() {
        let (_bus, _screen, mut shell) = shell_with_screen("");
        type_str(&mut shell, "hello world");
        shell.on_key(&Key::named(KeyName::ArrowLeft).with_mods(Modifiers::ALT));
        assert_eq!(shell.line().cursor(), 6);
        shell.on_key(&Key::named(KeyName::Home));
        assert_eq!(shell.line().cursor(), 0);
        shell.on_key(&Key::named(KeyName::ArrowRight).with_mods(Modifiers::ALT));
        assert_eq!(shell.line().cursor(), 6);
        shell.on_key(&Key::named(KeyName::End));
        assert_eq!(shell.line().cursor(), 11);
    }

    #[test]
    fn test_ignored_keys() {
        let (bus, screen, mut shell) = shell_with_screen("");
        shell.on_key(&Key::char('a').with_mods(Modifiers::CTRL));
        shell.on_key(&Key::char('b').with_mods(Modifiers::ALT));
        shell.on_key(&Key::new(KeyName::Char, "ねこ", Modifiers::empty()));
        shell.on_key(&Key::named(KeyName::Tab));
        bus.run_until_idle();

        assert!(shell.line().is_empty());
        assert!(screen.borrow().commands.is_empty());
    }

    #[test]
    fn test_enter_commits_and_prompts() {
        let (bus, screen, mut shell) = shell_with_screen("$ ");
        type_str(&mut shell, "clear");
        shell.on_key(&Key::named(KeyName::Enter));
        bus.run_until_idle();

        assert_eq!(shell.history().last(), Some("clear"));
        assert!(shell.line().is_empty());
        assert_eq!(
            screen.borrow().commands[5..],
            [
                write("\r\n"),
                TerminalCommand::Clear,
                TerminalCommand::HideCursor,
                write("$ "),
                TerminalCommand::ShowCursor,
            ]
        );
    }

    #[test]
    fn test_unknown_command_reports() {
        let (bus, screen, mut shell) = shell_with_screen("");
        type_str(&mut shell, "ls -l");
        shell.on_key(&Key::named(KeyName::Enter));
        bus.run_until_idle();

        assert!(screen
            .borrow()
            .commands
            .contains(&write("ls: command not found\r\n")));
    }

    #[test]
    fn test_history_recall() {
        let (_bus, _screen, mut shell) = shell_with_screen("");
        for line in ["history", "clear"] {
            type_str(&mut shell, line);
            shell.on_key(&Key::named(KeyName::Enter));
        }
        type_str(&mut shell, "dra");

        shell.on_key(&Key::named(KeyName::ArrowUp));
        assert_eq!(shell.line().text(), "clear");
        shell.on_key(&Key::named(KeyName::ArrowUp));
        assert_eq!(shell.line().text(), "history");
        shell.on_key(&Key::named(KeyName::ArrowUp));
        assert_eq!(shell.line().text(), "history");
        shell.on_key(&Key::named(KeyName::ArrowDown));
        assert_eq!(shell.line().text(), "clear");
        shell.on_key(&Key::named(KeyName::ArrowDown));
        assert_eq!(shell.line().text(), "dra");
        assert_eq!(shell.line().cursor(), 3);
    }
}
