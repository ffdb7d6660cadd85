//! Shared scheduling state.
//!
//! # Data Flow
//! ```text
//! Executor / admin handlers
//!     → store.rs (single mutex: health records, rotation cursor, proxies)
//!     → activity.rs (bounded in-memory journal of every mutation)
//!
//! Autosave / shutdown
//!     → store.rs snapshot (under lock)
//!     → persistence.rs save (outside lock)
//!
//! Startup
//!     → persistence.rs load
//!     → snapshot.rs lenient decode
//!     → store.rs restore
//! ```
//!
//! # Design Decisions
//! - One coarse lock; critical sections never sleep or touch disk
//! - The activity journal is observability only and is not persisted
//! - Loading is lenient so hand-edited state files still restore

pub mod activity;
pub mod persistence;
pub mod snapshot;
pub mod store;

pub use activity::{ActivityEntry, ActivityLog};
pub use persistence::{JsonFileStore, MemoryStore, PersistError, SnapshotStore};
pub use snapshot::Snapshot;
pub use store::{ControlError, QuarantinedEntity, StateStore};
