//! Kernel core components.
//!
//! - **ids**: Id allocation with free-list reuse
//! - **tick**: Deferred task queue (the "later turn" of the loop)
//! - **bus**: Named publish/subscribe topics with deferred delivery
//! - **key**: Keystroke values
//! - **session**: One bus, one process manager and one terminal surface
//!
//! # Architecture
//!
//! ```text
//! Session
//! ├── EventBus ── TaskQueue
//! │   ├── "key"               -> ProcessManager
//! │   ├── "process-control"   -> ProcessManager
//! │   └── "terminal-command"  -> SurfaceAdapter
//! └── ProcessManager
//!     └── ProcessEntry (ProcessState + Program)
//! ```

pub mod ids;
pub mod tick;
pub mod bus;
pub mod key;
pub mod session;
