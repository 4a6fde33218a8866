//! vtkernel - a terminal-session kernel
//!
//! - **core**: ids, deferred task queue, event bus, keys and the session
//! - **proc**: process table, capability handles and programs
//! - **ui**: crossterm key mapping and terminal output
//! - **history**: committed-line history for the shell
//! - **config**: `~/.vtkernel/config.toml`

pub mod core;
pub mod proc;
pub mod ui;
pub mod history;
pub mod config;
