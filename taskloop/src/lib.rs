//! Loop runner that drives an AI coding agent through a task list.
//!
//! Each iteration re-reads the task list, launches the agent once for the first
//! incomplete task, and shows a live progress block while it works. The loop
//! ends when every task passes, the iteration budget is spent, or the operator
//! interrupts. The architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (parsing, selection, budgets, frame text).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (task list files, child processes,
//!   signals, terminal drawing). Isolated to enable scripted executors in tests.
//!
//! Orchestration modules ([`looping`], [`attempt`], [`status`]) coordinate core
//! logic with I/O to implement CLI commands.

pub mod attempt;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod looping;
pub mod status;
pub mod task;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
