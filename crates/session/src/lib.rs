//! # Assist Session
//!
//! The keystroke-facing layer: a reducer-style autocomplete state
//! machine, the token-replacement rules, and an async driver that wires
//! the reducer to tokio timers and the catalog orchestrator.
//!
//! The reducer ([`Autocomplete`]) is synchronous and pure — events in,
//! effects out — so every transition and invariant is testable without a
//! runtime. The driver ([`Session`]) executes effects: it runs the
//! debounce timer, launches suggestion rounds, discards stale results by
//! round id, and resolves replacements (server-side first when the
//! catalog offers it, local algorithm otherwise).

mod driver;
mod replace;
mod state;

pub use driver::{Session, SessionConfig, SessionHandle};
pub use replace::apply_replacement;
pub use state::{Autocomplete, AutocompleteState, Effect, Event, Phase, RoundResult};
