//! Side-effecting operations: files, processes, signals, terminal.

pub mod config;
pub mod context;
pub mod display;
pub mod executor;
pub mod init;
pub mod interrupt;
pub mod process;
pub mod prompt;
pub mod renderer;
pub mod task_source;
