//! Stable exit codes for taskloop CLI commands.

/// Task list completed, iteration budget reached, or status printed.
pub const OK: i32 = 0;
/// Invalid arguments, config, task list or prompt template, or any other error.
pub const INVALID: i32 = 1;
/// The operator interrupted the run (128 + SIGINT).
pub const INTERRUPTED: i32 = 130;
