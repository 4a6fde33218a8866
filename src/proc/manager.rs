//! Process Manager - owns the process table and the foreground pointer

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, error, warn};

use crate::core::bus::{BusError, EventBus, Message, ProcessRequest, KEY_TOPIC, PROCESS_TOPIC};
use crate::core::ids::{Id, IdAllocator};
use crate::core::key::Key;

use super::program::{Hooks, ProcessError, Program};
use super::readline::ShellOptions;
use super::state::ProcessState;
use super::stream::StreamTable;

/// Listener name used on every topic the manager follows
pub const LISTENER_NAME: &str = "process-manager";

/// One row of the process table
pub struct ProcessEntry {
    pub id: Id,
    pub parent: Option<Id>,
    pub state: ProcessState,
    pub program: Program,
}

/// Manager settings
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// Number of pids ready before the pool first grows
    pub initial_capacity: usize,
    /// Settings for shells launched through `exec`
    pub shell: ShellOptions,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            initial_capacity: 1,
            shell: ShellOptions::default(),
        }
    }
}

/// Process table with a single foreground process
pub struct ProcessManager {
    bus: Rc<EventBus>,
    /// Pid pool
    ids: IdAllocator,
    /// Live processes
    processes: HashMap<Id, ProcessEntry>,
    /// Process receiving keys, if any
    foreground: Option<Id>,
    /// Streams shared by all handles
    streams: Rc<RefCell<StreamTable>>,
    options: ManagerOptions,
}

impl ProcessManager {
    /// Create a manager and subscribe it to the key and process-control
    /// topics, which must already be registered on `bus`.
    pub fn new(bus: Rc<EventBus>, options: ManagerOptions) -> Result<Rc<RefCell<Self>>, BusError> {
        let manager = Rc::new(RefCell::new(Self {
            bus: bus.clone(),
            ids: IdAllocator::with_capacity(options.initial_capacity),
            processes: HashMap::new(),
            foreground: None,
            streams: Rc::new(RefCell::new(StreamTable::new())),
            options,
        }));

        bus.subscribe(KEY_TOPIC, LISTENER_NAME, &manager, Self::handle_event)?;
        bus.subscribe(PROCESS_TOPIC, LISTENER_NAME, &manager, Self::handle_event)?;
        Ok(manager)
    }

    /// Bus entry point
    fn handle_event(&mut self, message: &Message) {
        match message {
            Message::Key(key) => self.dispatch_key(key),
            Message::Process(ProcessRequest::Exec { parent, args }) => {
                if !self.processes.contains_key(parent) {
                    warn!(parent, ?args, "exec from a closed process ignored");
                    return;
                }
                if let Err(e) = self.exec(Some(*parent), args) {
                    error!(parent, ?args, "exec failed: {}", e);
                }
            }
            Message::Process(ProcessRequest::Exit { pid }) => {
                if let Err(e) = self.close(*pid) {
                    error!(pid, "close failed: {}", e);
                }
            }
            Message::Terminal(_) => {}
        }
    }

    /// Start `program` as a background process
    pub fn open(&mut self, parent: Option<Id>, mut program: Program) -> Id {
        let id = self.ids.alloc();
        let state = ProcessState::new(id, self.bus.clone(), self.streams.clone());
        program.on_start(state.clone());

        debug!(pid = id, ?parent, kind = program.kind().name(), "process opened");
        self.processes.insert(
            id,
            ProcessEntry {
                id,
                parent,
                state,
                program,
            },
        );
        id
    }

    /// Close a process; unknown pids are ignored.
    ///
    /// If it was in the foreground, its parent (when still alive) takes over
    /// the terminal.
    pub fn close(&mut self, id: Id) -> Result<(), ProcessError> {
        let Some(mut entry) = self.processes.remove(&id) else {
            debug!(pid = id, "close of unknown process ignored");
            return Ok(());
        };

        entry.program.on_end();
        entry.state.disable();

        if self.foreground == Some(id) {
            self.foreground = entry.parent.filter(|p| self.processes.contains_key(p));
            if let Some(parent) = self.foreground.and_then(|p| self.processes.get_mut(&p)) {
                parent.state.enable();
                parent.program.on_focus(true);
            }
        }

        self.ids.free(id)?;
        debug!(pid = id, foreground = ?self.foreground, "process closed");
        Ok(())
    }

    /// Give `id` the terminal and keyboard; unknown pids are ignored
    pub fn bring_to_front(&mut self, id: Id) {
        if !self.processes.contains_key(&id) {
            debug!(pid = id, "bring_to_front of unknown process ignored");
            return;
        }

        if let Some(current) = self.foreground.and_then(|f| self.processes.get_mut(&f)) {
            current.state.disable();
            current.program.on_focus(false);
        }

        self.foreground = Some(id);
        if let Some(entry) = self.processes.get_mut(&id) {
            entry.state.enable();
            entry.program.on_focus(true);
        }
        debug!(pid = id, "process in foreground");
    }

    /// Forward a key to the foreground program, if there still is one
    pub fn dispatch_key(&mut self, key: &Key) {
        let Some(pid) = self.foreground else {
            return;
        };
        if let Some(entry) = self.processes.get_mut(&pid) {
            entry.program.on_key(key);
        }
    }

    /// Launch the program named by `args[0]` and bring it to the front
    pub fn exec(&mut self, parent: Option<Id>, args: &[String]) -> Result<Id, ProcessError> {
        let program = Program::from_args(args, &self.options.shell)?;
        let id = self.open(parent, program);
        self.bring_to_front(id);
        Ok(id)
    }

    pub fn foreground(&self) -> Option<Id> {
        self.foreground
    }

    pub fn contains(&self, id: Id) -> bool {
        self.processes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn parent_of(&self, id: Id) -> Option<Id> {
        self.processes.get(&id).and_then(|e| e.parent)
    }

    pub fn program(&self, id: Id) -> Option<&Program> {
        self.processes.get(&id).map(|e| &e.program)
    }

    /// A copy of the handle given to `id`
    pub fn state(&self, id: Id) -> Option<ProcessState> {
        self.processes.get(&id).map(|e| e.state.clone())
    }

    pub fn is_enabled(&self, id: Id) -> bool {
        self.processes
            .get(&id)
            .is_some_and(|e| e.state.is_enabled())
    }

    pub fn streams(&self) -> &Rc<RefCell<StreamTable>> {
        &self.streams
    }
}
