//! Language-model code generation with a static-analysis repair loop.
//!
//! A model reply is split into one source file per top-level type, every file
//! is handed to an external analyzer, and the first reported defect is fed
//! back to the model until a round comes back clean or the attempt budget
//! runs out. The architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (partitioning, verdicts,
//!   conversation log). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting adapters (filesystem, analyzer process, HTTP,
//!   console). Collaborators sit behind traits so tests can script them.
//!
//! Orchestration modules ([`repair`], [`single_pass`]) coordinate core logic
//! with I/O to implement CLI commands.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod repair;
pub mod single_pass;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
