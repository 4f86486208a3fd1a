//! # Assist Catalog
//!
//! The async boundary of the completion engine: the remote catalog
//! interface, a TTL'd candidate cache, a bounded concurrency gate, and
//! the orchestrator that plans and runs the lookups one cursor context
//! needs.
//!
//! Everything above this crate is synchronous and pure; everything
//! below it is the host's transport.

mod cache;
mod client;
mod error;
mod gate;
mod orchestrator;

pub use cache::{CacheStats, CandidateCache, Clock, SystemClock};
pub use client::{CatalogClient, CatalogSnapshot, StaticCatalog};
pub use error::{CatalogError, Result};
pub use gate::FetchGate;
pub use orchestrator::{LookupFailure, LookupField, Orchestrator, OrchestratorConfig, RoundOutcome};
