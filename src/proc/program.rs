//! Programs scheduled by the process manager

use thiserror::Error;

use crate::core::bus::BusError;
use crate::core::ids::IdError;
use crate::core::key::{Key, KeyName};

use super::readline::{Shell, ShellOptions};
use super::state::ProcessState;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("{0}: command not found")]
    UnsupportedProgram(String),

    #[error(transparent)]
    Id(#[from] IdError),

    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Lifecycle hooks. Every hook is optional.
pub trait Hooks {
    /// Receives the handle used to talk to the terminal
    fn on_start(&mut self, _api: ProcessState) {}

    /// The process is being closed
    fn on_end(&mut self) {}

    /// A keypress while in the foreground
    fn on_key(&mut self, _key: &Key) {}

    /// Gained (true) or lost (false) the foreground
    fn on_focus(&mut self, _focused: bool) {}
}

/// Known program kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgramKind {
    Echo,
    Shell,
}

impl ProgramKind {
    /// Resolve a program name as typed on a command line
    pub fn from_name(name: &str) -> Result<Self, ProcessError> {
        match name {
            "echo" => Ok(Self::Echo),
            "readline" | "shell" | "sh" => Ok(Self::Shell),
            _ => Err(ProcessError::UnsupportedProgram(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Echo => "echo",
            Self::Shell => "shell",
        }
    }
}

/// A schedulable program
pub enum Program {
    Echo(Echo),
    Shell(Shell),
}

impl Program {
    /// Build the program named by `args[0]`; the rest are its arguments
    pub fn from_args(args: &[String], options: &ShellOptions) -> Result<Self, ProcessError> {
        let name = args.first().map(String::as_str).unwrap_or_default();
        let rest = args.get(1..).unwrap_or_default().to_vec();
        Ok(match ProgramKind::from_name(name)? {
            ProgramKind::Echo => Program::Echo(Echo::new(rest)),
            ProgramKind::Shell => Program::Shell(Shell::new(options.clone())),
        })
    }

    pub fn kind(&self) -> ProgramKind {
        match self {
            Program::Echo(_) => ProgramKind::Echo,
            Program::Shell(_) => ProgramKind::Shell,
        }
    }

    fn hooks(&mut self) -> &mut dyn Hooks {
        match self {
            Program::Echo(p) => p as &mut dyn Hooks,
            Program::Shell(p) => p as &mut dyn Hooks,
        }
    }

    pub fn as_shell(&self) -> Option<&Shell> {
        match self {
            Program::Shell(shell) => Some(shell),
            _ => None,
        }
    }
}

impl Hooks for Program {
    fn on_start(&mut self, api: ProcessState) {
        self.hooks().on_start(api);
    }

    fn on_end(&mut self) {
        self.hooks().on_end();
    }

    fn on_key(&mut self, key: &Key) {
        self.hooks().on_key(key);
    }

    fn on_focus(&mut self, focused: bool) {
        self.hooks().on_focus(focused);
    }
}

impl From<Shell> for Program {
    fn from(shell: Shell) -> Self {
        Program::Shell(shell)
    }
}

impl From<Echo> for Program {
    fn from(echo: Echo) -> Self {
        Program::Echo(echo)
    }
}

/// Echoes keys back to the terminal.
///
/// Started with arguments it prints them once it has the terminal and
/// exits, like `echo` in a shell.
#[derive(Default)]
pub struct Echo {
    api: Option<ProcessState>,
    args: Vec<String>,
    printed: bool,
}

impl Echo {
    pub fn new(args: Vec<String>) -> Self {
        Self {
            api: None,
            args,
            printed: false,
        }
    }
}

impl Hooks for Echo {
    fn on_start(&mut self, api: ProcessState) {
        self.api = Some(api);
    }

    fn on_focus(&mut self, focused: bool) {
        if !focused || self.args.is_empty() || self.printed {
            return;
        }
        if let Some(api) = &self.api {
            api.write(&format!("{}\r\n", self.args.join(" ")));
            api.exit();
            self.printed = true;
        }
    }

    fn on_key(&mut self, key: &Key) {
        let Some(api) = &self.api else { return };
        // Ctrl+C / Ctrl+D end interactive echo
        if key.ctrl() && matches!(key.text(), "c" | "d") {
            api.write("\r\n");
            api.exit();
            return;
        }
        if *key.name() == KeyName::Enter {
            api.write("\r\n");
        } else if !key.text().is_empty() {
            api.write(key.text());
        }
    }
}
