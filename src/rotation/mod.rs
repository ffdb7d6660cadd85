//! Rotation subsystem.
//!
//! # Data Flow
//! ```text
//! Discovered entities (stable order)
//!     → partition.rs (contiguous chunks into N groups)
//!     → cursor.rs (round-robin group index, advance or peek)
//!     → one group handed to the executor per pass
//! ```
//!
//! # Design Decisions
//! - Partitioning is recomputed every pass; only the cursor is state
//! - Cursor advance happens inside the store lock so concurrent passes never share an index
//! - Peek vs advance is an explicit parameter, not two call sites

pub mod cursor;
pub mod partition;

pub use cursor::{GroupSelection, GroupSlot, RotationState};
pub use partition::partition;
