//! Side-effecting adapters: filesystem, processes, HTTP and the console.

pub mod analyzer;
pub mod config;
pub mod generator;
pub mod input;
pub mod process;
pub mod prompt;
pub mod round_log;
pub mod transcript;
pub mod units;
