//! Terminal surface
//!
//! The surface is where terminal commands end up. `SurfaceAdapter` listens on
//! the "terminal-command" topic and forwards each command to a `Surface`:
//! crossterm output for a real terminal, or a recorder for tests.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use crossterm::{
    cursor::{Hide, MoveTo, MoveToColumn, Show},
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};
use tracing::error;

use crate::core::bus::{BusError, EventBus, Message, TerminalCommand, TERMINAL_TOPIC};

/// Listener name of the adapter on the terminal-command topic
pub const LISTENER_NAME: &str = "surface";

/// Something that can carry out terminal commands
pub trait Surface {
    fn apply(&mut self, command: &TerminalCommand) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Surface writing ANSI sequences through crossterm
pub struct CrosstermSurface<W: Write> {
    out: W,
}

impl CrosstermSurface<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> CrosstermSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Surface for CrosstermSurface<W> {
    fn apply(&mut self, command: &TerminalCommand) -> io::Result<()> {
        match command {
            TerminalCommand::Clear => queue!(self.out, Clear(ClearType::All), MoveTo(0, 0)),
            TerminalCommand::Write(text) => queue!(self.out, Print(text)),
            TerminalCommand::ShowCursor => queue!(self.out, Show),
            TerminalCommand::HideCursor => queue!(self.out, Hide),
            TerminalCommand::SetCursorX(x) => queue!(self.out, MoveToColumn(*x)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Surface that only remembers what it was told
#[derive(Debug, Default)]
pub struct RecordingSurface {
    commands: Vec<TerminalCommand>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[TerminalCommand] {
        &self.commands
    }

    /// Everything written, concatenated
    pub fn text(&self) -> String {
        self.commands
            .iter()
            .filter_map(|c| match c {
                TerminalCommand::Write(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl Surface for RecordingSurface {
    fn apply(&mut self, command: &TerminalCommand) -> io::Result<()> {
        self.commands.push(command.clone());
        Ok(())
    }
}

/// Bus listener driving a surface
pub struct SurfaceAdapter<S: Surface> {
    surface: S,
}

impl<S: Surface + 'static> SurfaceAdapter<S> {
    /// Wrap `surface` and subscribe it to the terminal-command topic
    pub fn attach(bus: &EventBus, surface: S) -> Result<Rc<RefCell<Self>>, BusError> {
        let adapter = Rc::new(RefCell::new(Self { surface }));
        bus.subscribe(TERMINAL_TOPIC, LISTENER_NAME, &adapter, Self::handle_event)?;
        Ok(adapter)
    }

    fn handle_event(&mut self, message: &Message) {
        if let Message::Terminal(command) = message {
            if let Err(e) = self.surface.apply(command) {
                error!(?command, "terminal surface error: {}", e);
            }
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn flush(&mut self) {
        if let Err(e) = self.surface.flush() {
            error!("terminal surface flush failed: {}", e);
        }
    }
}
