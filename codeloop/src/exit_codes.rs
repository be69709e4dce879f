//! Stable exit codes for codeloop CLI commands.

/// Command succeeded; `run` converged.
pub const OK: i32 = 0;
/// Invalid input, invalid config, or a fatal collaborator error.
pub const INVALID: i32 = 1;
/// `run` spent its attempt budget without a clean round.
pub const EXHAUSTED: i32 = 2;
