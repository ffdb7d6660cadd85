//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Init logging/metrics → Build scheduler → Restore state
//!     → Autosave → Admin listener
//!
//! Scheduler (supervisor.rs, cancel.rs):
//!     start → loop { spawn pass → pause } ← cancel on stop
//!
//! Shutdown (signals.rs, shutdown.rs):
//!     SIGTERM/SIGINT → stop accepting admin requests → stop loop → final save → exit
//! ```
//!
//! # Design Decisions
//! - Passes run in their own task so a panic is contained
//! - Stop waits a bounded time, then aborts the loop
//! - Autosave lives as long as the process, not the loop

pub mod cancel;
pub mod shutdown;
pub mod signals;
pub mod supervisor;

pub use cancel::{CancelToken, Cancellation};
pub use shutdown::Shutdown;
pub use supervisor::Supervisor;
