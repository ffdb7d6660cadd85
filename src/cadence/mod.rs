//! Cadence planning subsystem.
//!
//! # Data Flow
//! ```text
//! Group resolved by the executor
//!     → planner.rs (base delay from group size and target cycle length)
//!     → random.rs (jitter draw, injection draws)
//!     → clock.rs (local hour for active-hours derating)
//!     → per-entity delay handed back to the executor
//! ```
//!
//! # Design Decisions
//! - Randomness comes from the OS CSPRNG so the timing carries no periodic fingerprint
//! - Random source and clock are traits so tests can pin both
//! - Planner functions are pure given their inputs

pub mod clock;
pub mod planner;
pub mod random;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use planner::{per_entity_delay, should_inject, ActiveHours, CadenceConfig};
pub use random::{OsRandom, RandomSource, SequenceRandom};
