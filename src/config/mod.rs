//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! rotator.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RotatorConfig (validated, immutable)
//!     → safety section published to the engine via ArcSwap
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → safety section swapped in; other sections need a restart
//! ```
//!
//! # Design Decisions
//! - All fields have defaults so an empty file is a valid config
//! - Validation separates syntactic (serde) from semantic checks
//! - A bad reload keeps the running configuration

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::AdminConfig;
pub use schema::DiscoveryConfig;
pub use schema::ObservabilityConfig;
pub use schema::PersistenceConfig;
pub use schema::RotatorConfig;
pub use schema::SafetyConfig;
pub use schema::TlsConfig;
