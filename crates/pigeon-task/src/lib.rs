//! Pigeon Task
//!
//! Thread-plus-cancellation primitive shared by the directory watcher and the
//! job runner.
//!
//! # Overview
//!
//! - **[`CancellationToken`]**: a flag plus an interruptible wait. Loops call
//!   [`CancellationToken::wait_timeout`] as a cancellable sleep between
//!   iterations.
//! - **[`TaskRegistry`]**: spawns named OS threads, hands each one its own
//!   token and remembers `handle -> (token, join handle)` in spawn order.
//!   Each watcher or runner owns its registry; there is no process-wide state.
//! - **[`KillOutcome`]**: the result of stopping a task. Failures are reported
//!   through this value and never raised.
//!
//! # Usage
//!
//! ```
//! use pigeon_task::TaskRegistry;
//! use std::time::Duration;
//!
//! let registry = TaskRegistry::new("example");
//! let handle = registry
//!     .spawn("ticker", |token| {
//!         while !token.wait_timeout(Duration::from_millis(10)) {
//!             // periodic work
//!         }
//!     })
//!     .unwrap();
//!
//! assert!(registry.kill(&handle).is_success());
//! assert!(!registry.is_registered(&handle));
//! ```

#![warn(missing_docs)]

mod error;
mod registry;
mod token;

pub use error::TaskError;
pub use registry::{panic_message, KillOutcome, TaskHandle, TaskRegistry};
pub use token::CancellationToken;

/// Boxed error returned by user-supplied handlers and jobs
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
