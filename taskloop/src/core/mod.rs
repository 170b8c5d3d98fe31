//! Deterministic, pure logic shared by the loop core.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod budget;
pub mod frame;
pub mod invariants;
pub mod markdown;
pub mod selector;
pub mod types;
