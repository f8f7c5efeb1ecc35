//! Pigeon CLI library.
//!
//! Argument parsing, tracing setup and the counter demo behind the
//! `pigeon-watch` and `pigeon-counter` binaries.

pub mod cli;
pub mod counter;
pub mod logging;

pub use cli::{CliTimestamp, CounterCli, WatchCli};
pub use counter::count_to;
pub use logging::init_tracing;
