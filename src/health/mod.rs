//! Per-entity health subsystem.
//!
//! # Data Flow
//! ```text
//! Executor about to refresh an entity
//!     → policy::is_eligible (quarantine first, then backoff window)
//!
//! Refresh outcome observed
//!     → policy::on_success / policy::on_failure
//!     → backoff.rs (exponential, capped)
//!     → state.rs record updated inside the store's critical section
//! ```
//!
//! # Design Decisions
//! - Quarantine is a consequence of the failure counter, never set on its own
//! - Failure handling is deterministic; no jitter on backoff
//! - Success always lifts quarantine

pub mod backoff;
pub mod policy;
pub mod state;

pub use policy::{FailureOutcome, FailurePolicy};
pub use state::{Eligibility, HealthRecord, SkipReason};
