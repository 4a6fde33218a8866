//! Per-process capability handle
//!
//! Programs never touch the terminal surface. Everything they do goes through
//! a `ProcessState`, which turns calls into bus messages while the process is
//! in the foreground and drops them otherwise.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::core::bus::{EventBus, Message, ProcessRequest, TerminalCommand, PROCESS_TOPIC, TERMINAL_TOPIC};
use crate::core::ids::{Id, IdError};

use super::program::{ProcessError, ProgramKind};
use super::stream::StreamTable;

/// Capability handle bound to one pid.
///
/// Clones share the enabled flag, so the manager's copy controls the copy
/// the program holds.
#[derive(Clone)]
pub struct ProcessState {
    pid: Id,
    bus: Rc<EventBus>,
    streams: Rc<RefCell<StreamTable>>,
    enabled: Rc<Cell<bool>>,
}

impl ProcessState {
    /// Create a disabled handle
    pub fn new(pid: Id, bus: Rc<EventBus>, streams: Rc<RefCell<StreamTable>>) -> Self {
        Self {
            pid,
            bus,
            streams,
            enabled: Rc::new(Cell::new(false)),
        }
    }

    pub fn pid(&self) -> Id {
        self.pid
    }

    pub fn enable(&self) {
        self.enabled.set(true);
    }

    pub fn disable(&self) {
        self.enabled.set(false);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    fn terminal(&self, command: TerminalCommand) {
        if self.is_enabled() {
            self.bus.publish(TERMINAL_TOPIC, Message::Terminal(command));
        } else {
            tracing::trace!(pid = self.pid, ?command, "background output dropped");
        }
    }

    pub fn write(&self, text: &str) {
        self.terminal(TerminalCommand::Write(text.to_string()));
    }

    pub fn clear(&self) {
        self.terminal(TerminalCommand::Clear);
    }

    pub fn show_cursor(&self) {
        self.terminal(TerminalCommand::ShowCursor);
    }

    pub fn hide_cursor(&self) {
        self.terminal(TerminalCommand::HideCursor);
    }

    pub fn set_cursor_x(&self, x: u16) {
        self.terminal(TerminalCommand::SetCursorX(x));
    }

    /// Ask the manager to launch `args[0]` as a child of this process.
    ///
    /// The program name is checked here so the caller learns about unknown
    /// programs immediately; the launch itself happens on a later tick.
    pub fn exec(&self, args: &[String]) -> Result<(), ProcessError> {
        let name = args.first().map(String::as_str).unwrap_or_default();
        ProgramKind::from_name(name)?;
        if self.is_enabled() {
            self.bus.publish(
                PROCESS_TOPIC,
                Message::Process(ProcessRequest::Exec {
                    parent: self.pid,
                    args: args.to_vec(),
                }),
            );
        }
        Ok(())
    }

    /// Ask the manager to close this process
    pub fn exit(&self) {
        if self.is_enabled() {
            self.bus.publish(
                PROCESS_TOPIC,
                Message::Process(ProcessRequest::Exit { pid: self.pid }),
            );
        }
    }

    pub fn open_stream(&self) -> Id {
        self.streams.borrow_mut().open()
    }

    pub fn write_fd(&self, fd: Id, text: &str) -> bool {
        self.streams.borrow_mut().write(fd, text)
    }

    pub fn read_fd(&self, fd: Id) -> Option<String> {
        self.streams.borrow_mut().read(fd)
    }

    pub fn close_stream(&self, fd: Id) -> Result<(), IdError> {
        self.streams.borrow_mut().close(fd)
    }
}
