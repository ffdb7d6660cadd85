//! Cycle execution subsystem.
//!
//! # Data Flow
//! ```text
//! Supervisor loop / on-demand request
//!     → discovery (collaborators.rs, discovery.rs)
//!     → rotation::partition + StateStore::select_group
//!     → cadence::per_entity_delay
//!     → per entity (cycle.rs):
//!         eligibility → long break? → interaction? → refresh → record outcome → sleep
//!     → PassReport
//! ```
//!
//! # Design Decisions
//! - Collaborators are traits; the shipped refresh and interaction are simulations
//! - Cancellation is checked before every entity and interrupts the throttle sleep
//! - Nothing is rolled back when a pass is cancelled

pub mod collaborators;
pub mod cycle;
pub mod discovery;
pub mod simulated;

pub use collaborators::{
    Collaborators, DiscoveryError, EntityDiscovery, EntityRef, InteractionHook, RefreshAction, RefreshError,
};
pub use cycle::{CycleExecutor, PassReport};
pub use discovery::{DirectoryDiscovery, StaticDiscovery};
pub use simulated::{SimulatedInteraction, SimulatedRefresh};
