//! Throttled rotation scheduler for a fleet of browser profiles.
//!
//! Profiles are split into fixed rotation groups; each pass refreshes one
//! group with jittered spacing, backs failing profiles off exponentially and
//! quarantines the ones that keep failing.

// Scheduling engine
pub mod cadence;
pub mod executor;
pub mod health;
pub mod rotation;
pub mod scheduler;
pub mod state;

// Surfaces
pub mod admin;
pub mod http;
pub mod net;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::RotatorConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use scheduler::{Scheduler, SchedulerBuilder, Summary};
