//! Session wiring
//!
//! A session owns one event bus, one process manager and one terminal
//! surface. Nothing is global, so several sessions can live side by side.

use std::cell::RefCell;
use std::rc::Rc;
use tracing::info;

use super::bus::{EventBus, Message, KEY_TOPIC, PROCESS_TOPIC, TERMINAL_TOPIC};
use super::ids::Id;
use super::key::Key;
use super::tick::TaskQueue;
use crate::config::Config;
use crate::proc::{ProcessError, ProcessManager};
use crate::ui::surface::{Surface, SurfaceAdapter};

/// Program started as the root process
const ROOT_PROGRAM: &str = "shell";

/// One terminal session
pub struct Session<S: Surface + 'static> {
    bus: Rc<EventBus>,
    manager: Rc<RefCell<ProcessManager>>,
    surface: Rc<RefCell<SurfaceAdapter<S>>>,
    root: Option<Id>,
}

impl<S: Surface + 'static> Session<S> {
    /// Create a session drawing on `surface`
    pub fn new(config: &Config, surface: S) -> Result<Self, ProcessError> {
        let queue = Rc::new(TaskQueue::with_max_ticks(config.bus.max_ticks_per_drain));
        let bus = Rc::new(EventBus::with_queue(queue));
        for topic in [KEY_TOPIC, TERMINAL_TOPIC, PROCESS_TOPIC] {
            bus.register(topic)?;
        }

        let manager = ProcessManager::new(bus.clone(), config.manager_options())?;
        let surface = SurfaceAdapter::attach(&bus, surface)?;

        Ok(Self {
            bus,
            manager,
            surface,
            root: None,
        })
    }

    /// Open the root shell and give it the terminal
    pub fn start(&mut self) -> Result<Id, ProcessError> {
        let id = self
            .manager
            .borrow_mut()
            .exec(None, &[ROOT_PROGRAM.to_string()])?;
        self.root = Some(id);
        info!(pid = id, "session started");
        Ok(id)
    }

    /// Queue a keystroke for the foreground process
    pub fn feed_key(&self, key: Key) {
        self.bus.publish(KEY_TOPIC, Message::Key(key));
    }

    /// Deliver everything queued, then flush the surface
    pub fn run_pending(&self) -> usize {
        let ran = self.bus.run_until_idle();
        self.surface.borrow_mut().flush();
        if ran > 0 && !self.is_running() {
            info!("session finished");
        }
        ran
    }

    /// True while any process is alive
    pub fn is_running(&self) -> bool {
        !self.manager.borrow().is_empty()
    }

    pub fn root(&self) -> Option<Id> {
        self.root
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn manager(&self) -> &Rc<RefCell<ProcessManager>> {
        &self.manager
    }

    pub fn surface(&self) -> &Rc<RefCell<SurfaceAdapter<S>>> {
        &self.surface
    }
}
