//! Virtual processes.
//!
//! - **manager**: `ProcessManager`, the process table and foreground pointer
//! - **state**: `ProcessState`, the per-process capability handle
//! - **program**: Program variants and their lifecycle hooks
//! - **readline**: Line buffer and the shell built on it
//! - **stream**: In-memory streams addressed by stream ids

pub mod manager;
pub mod state;
pub mod program;
pub mod readline;
pub mod stream;

pub use manager::{ManagerOptions, ProcessManager};
pub use program::{Echo, Hooks, ProcessError, Program, ProgramKind};
pub use readline::{LineBuffer, Shell, ShellOptions};
pub use state::ProcessState;
