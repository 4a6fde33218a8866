//! Named publish/subscribe bus
//!
//! Topics are registered once per session. Publishing snapshots the topic's
//! listeners and schedules one deferred delivery per listener on the task
//! queue, so handlers never run inside `publish` itself.
//!
//! Each subscription carries a bus-wide generation number. A delivery only
//! runs if the listener name still maps to the same generation when the task
//! fires; unsubscribing between publish and delivery cancels it.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, trace, warn};

use super::ids::Id;
use super::key::Key;
use super::tick::TaskQueue;

/// Raw keystrokes from the terminal surface
pub const KEY_TOPIC: &str = "key";
/// Display commands for the terminal surface
pub const TERMINAL_TOPIC: &str = "terminal-command";
/// Process lifecycle requests for the process manager
pub const PROCESS_TOPIC: &str = "process-control";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("topic '{0}' is already registered")]
    DuplicateTopic(String),

    #[error("topic '{0}' not found")]
    UnknownTopic(String),

    #[error("listener '{listener}' already subscribed to '{topic}'")]
    DuplicateListener { topic: String, listener: String },
}

/// Display command consumed by the terminal surface
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TerminalCommand {
    Clear,
    Write(String),
    ShowCursor,
    HideCursor,
    SetCursorX(u16),
}

/// Lifecycle request routed to the process manager
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessRequest {
    /// Launch `args[0]` as a child of `parent`
    Exec { parent: Id, args: Vec<String> },
    /// Close `pid`
    Exit { pid: Id },
}

/// Payload carried on the bus
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    Key(Key),
    Terminal(TerminalCommand),
    Process(ProcessRequest),
}

type Deliver = Rc<dyn Fn(&Message)>;

struct Listener {
    name: String,
    generation: u64,
    deliver: Deliver,
}

/// A named topic and its listeners, in subscription order
struct Channel {
    listeners: Vec<Listener>,
}

impl Channel {
    fn generation_of(&self, listener: &str) -> Option<u64> {
        self.listeners
            .iter()
            .find(|l| l.name == listener)
            .map(|l| l.generation)
    }
}

type Channels = Rc<RefCell<HashMap<String, Channel>>>;

/// Event bus shared by everything in one session
pub struct EventBus {
    channels: Channels,
    next_generation: Cell<u64>,
    queue: Rc<TaskQueue>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_queue(Rc::new(TaskQueue::new()))
    }

    /// Create a bus that defers work onto an existing queue
    pub fn with_queue(queue: Rc<TaskQueue>) -> Self {
        Self {
            channels: Rc::new(RefCell::new(HashMap::new())),
            next_generation: Cell::new(0),
            queue,
        }
    }

    /// Create a new named topic
    pub fn register(&self, topic: &str) -> Result<(), BusError> {
        let mut channels = self.channels.borrow_mut();
        if channels.contains_key(topic) {
            return Err(BusError::DuplicateTopic(topic.to_string()));
        }
        channels.insert(topic.to_string(), Channel { listeners: Vec::new() });
        debug!(topic, "topic registered");
        Ok(())
    }

    /// Subscribe `handler` on `target` under `listener`.
    ///
    /// The bus only keeps a weak reference to the target; deliveries to a
    /// dropped target are skipped.
    pub fn subscribe<T: 'static>(
        &self,
        topic: &str,
        listener: &str,
        target: &Rc<RefCell<T>>,
        handler: fn(&mut T, &Message),
    ) -> Result<(), BusError> {
        let mut channels = self.channels.borrow_mut();
        let channel = channels
            .get_mut(topic)
            .ok_or_else(|| BusError::UnknownTopic(topic.to_string()))?;
        if channel.generation_of(listener).is_some() {
            return Err(BusError::DuplicateListener {
                topic: topic.to_string(),
                listener: listener.to_string(),
            });
        }

        let weak = Rc::downgrade(target);
        let name = listener.to_string();
        let deliver: Deliver = Rc::new(move |message| {
            let Some(target) = weak.upgrade() else {
                trace!(listener = %name, "target dropped, delivery skipped");
                return;
            };
            match target.try_borrow_mut() {
                Ok(mut target) => handler(&mut target, message),
                Err(_) => warn!(listener = %name, "target busy, delivery dropped"),
            };
        });

        let generation = self.next_generation.get();
        self.next_generation.set(generation + 1);
        channel.listeners.push(Listener {
            name: listener.to_string(),
            generation,
            deliver,
        });
        debug!(topic, listener, generation, "listener subscribed");
        Ok(())
    }

    /// Remove a listener; absent topics or listeners are ignored
    pub fn unsubscribe(&self, topic: &str, listener: &str) {
        if let Some(channel) = self.channels.borrow_mut().get_mut(topic) {
            channel.listeners.retain(|l| l.name != listener);
            debug!(topic, listener, "listener unsubscribed");
        }
    }

    /// Schedule delivery of `message` to every current listener of `topic`
    pub fn publish(&self, topic: &str, message: Message) {
        let snapshot: Vec<(String, u64, Deliver)> = {
            let channels = self.channels.borrow();
            let Some(channel) = channels.get(topic) else {
                trace!(topic, "publish to unknown topic ignored");
                return;
            };
            channel
                .listeners
                .iter()
                .map(|l| (l.name.clone(), l.generation, l.deliver.clone()))
                .collect()
        };

        trace!(topic, listeners = snapshot.len(), ?message, "publish");
        let message = Rc::new(message);
        for (listener, generation, deliver) in snapshot {
            let channels = self.channels.clone();
            let topic = topic.to_string();
            let message = message.clone();
            self.queue.defer(move || {
                let live = channels
                    .borrow()
                    .get(&topic)
                    .and_then(|c| c.generation_of(&listener))
                    == Some(generation);
                if live {
                    deliver(&message);
                } else {
                    trace!(topic = %topic, listener = %listener, "stale delivery dropped");
                }
            });
        }
    }

    pub fn has_topic(&self, topic: &str) -> bool {
        self.channels.borrow().contains_key(topic)
    }

    /// Number of listeners on `topic` (zero if unknown)
    pub fn listener_count(&self, topic: &str) -> usize {
        self.channels
            .borrow()
            .get(topic)
            .map_or(0, |c| c.listeners.len())
    }

    pub fn queue(&self) -> &Rc<TaskQueue> {
        &self.queue
    }

    /// Run one tick of deferred deliveries
    pub fn run_pending(&self) -> usize {
        self.queue.tick()
    }

    /// Deliver until nothing is left in flight
    pub fn run_until_idle(&self) -> usize {
        self.queue.run_until_idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Vec<Message>,
    }

    impl Recorder {
        fn record(&mut self, message: &Message) {
            self.seen.push(message.clone());
        }
    }

    fn write(text: &str) -> Message {
        Message::Terminal(TerminalCommand::Write(text.to_string()))
    }

    #[test]
    fn test_register_twice() {
        let bus = EventBus::new();
        bus.register(KEY_TOPIC).unwrap();
        assert_eq!(
            bus.register(KEY_TOPIC),
            Err(BusError::DuplicateTopic(KEY_TOPIC.to_string()))
        );
    }

    #[test]
    fn test_subscribe_errors() {
        let bus = EventBus::new();
        let rec = Rc::new(RefCell::new(Recorder::default()));

        assert_eq!(
            bus.subscribe("missing", "rec", &rec, Recorder::record),
            Err(BusError::UnknownTopic("missing".to_string()))
        );

        bus.register("t").unwrap();
        bus.subscribe("t", "rec", &rec, Recorder::record).unwrap();
        assert!(matches!(
            bus.subscribe("t", "rec", &rec, Recorder::record),
            Err(BusError::DuplicateListener { .. })
        ));
    }

    #[test]
    fn test_delivery_is_deferred() {
        let bus = EventBus::new();
        bus.register("t").unwrap();
        let rec = Rc::new(RefCell::new(Recorder::default()));
        bus.subscribe("t", "rec", &rec, Recorder::record).unwrap();

        bus.publish("t", write("a"));
        assert!(rec.borrow().seen.is_empty());

        bus.run_until_idle();
        assert_eq!(rec.borrow().seen, vec![write("a")]);
    }

    #[test]
    fn test_publish_without_listeners() {
        let bus = EventBus::new();
        bus.register(KEY_TOPIC).unwrap();
        bus.publish(KEY_TOPIC, Message::Key(Key::char('a')));
        assert!(bus.queue().is_empty());

        let rec = Rc::new(RefCell::new(Recorder::default()));
        bus.subscribe(KEY_TOPIC, "late", &rec, Recorder::record).unwrap();
        bus.run_until_idle();
        assert!(rec.borrow().seen.is_empty());

        // Unknown topics are ignored
        bus.publish("nowhere", write("x"));
        assert!(bus.queue().is_empty());
    }

    #[test]
    fn test_listeners_fire_in_subscription_order() {
        struct Tagger {
            tag: &'static str,
            log: Rc<RefCell<Vec<&'static str>>>,
        }
        impl Tagger {
            fn on_message(&mut self, _message: &Message) {
                self.log.borrow_mut().push(self.tag);
            }
        }

        let bus = EventBus::new();
        bus.register("t").unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        let targets: Vec<_> = ["first", "second", "third"]
            .into_iter()
            .map(|tag| Rc::new(RefCell::new(Tagger { tag, log: log.clone() })))
            .collect();
        for target in &targets {
            let name = target.borrow().tag;
            bus.subscribe("t", name, target, Tagger::on_message).unwrap();
        }

        bus.publish("t", write("x"));
        bus.run_until_idle();
        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_subscriber_after_publish_misses_event() {
        let bus = EventBus::new();
        bus.register("t").unwrap();
        let early = Rc::new(RefCell::new(Recorder::default()));
        let late = Rc::new(RefCell::new(Recorder::default()));
        bus.subscribe("t", "early", &early, Recorder::record).unwrap();

        bus.publish("t", write("a"));
        bus.subscribe("t", "late", &late, Recorder::record).unwrap();
        bus.run_until_idle();

        assert_eq!(early.borrow().seen.len(), 1);
        assert!(late.borrow().seen.is_empty());
    }

    #[test]
    fn test_unsubscribe_before_delivery_cancels() {
        let bus = EventBus::new();
        bus.register("t").unwrap();
        let rec = Rc::new(RefCell::new(Recorder::default()));
        bus.subscribe("t", "rec", &rec, Recorder::record).unwrap();

        bus.publish("t", write("a"));
        bus.unsubscribe("t", "rec");
        bus.run_until_idle();
        assert!(rec.borrow().seen.is_empty());
    }

    #[test]
    fn test_resubscribe_does_not_revive_old_delivery() {
        let bus = EventBus::new();
        bus.register("t").unwrap();
        let rec = Rc::new(RefCell::new(Recorder::default()));
        bus.subscribe("t", "rec", &rec, Recorder::record).unwrap();

        bus.publish("t", write("old"));
        bus.unsubscribe("t", "rec");
        bus.subscribe("t", "rec", &rec, Recorder::record).unwrap();
        bus.publish("t", write("new"));
        bus.run_until_idle();

        assert_eq!(rec.borrow().seen, vec![write("new")]);
    }

    #[test]
    fn test_unsubscribe_unknown_is_noop() {
        let bus = EventBus::new();
        bus.unsubscribe("nothing", "nobody");
        bus.register("t").unwrap();
        bus.unsubscribe("t", "nobody");
        assert_eq!(bus.listener_count("t"), 0);
    }

    #[test]
    fn test_dropped_target_is_skipped() {
        let bus = EventBus::new();
        bus.register("t").unwrap();
        let rec = Rc::new(RefCell::new(Recorder::default()));
        bus.subscribe("t", "rec", &rec, Recorder::record).unwrap();
        drop(rec);

        bus.publish("t", write("a"));
        assert_eq!(bus.run_until_idle(), 1);
    }
}
