//! Deterministic, pure logic shared by the loop and the CLI.
//!
//! Core modules perform no filesystem, network or process I/O. They operate
//! on in-memory text and return deterministic outputs suitable for tests.

pub mod conversation;
pub mod language;
pub mod partition;
pub mod requirements;
pub mod types;
pub mod verdict;
