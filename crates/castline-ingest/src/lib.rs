//! Event processing for castline.
//!
//! The components that turn Hub messages into relational state: the
//! [`EventProcessor`] state machine, the [`RootParentResolver`] thread
//! walk, the [`BackfillProcessor`] bulk hydrator, and the concrete
//! collaborators they are wired with (HTTP hub client, stdout publisher).
//! Collaborators are injected at construction — nothing in this crate
//! reaches for ambient globals — so every component runs against test
//! doubles unchanged.

pub mod backfill;
pub mod error;
pub mod hub_http;
pub mod processor;
pub mod publish;
pub mod resolver;

pub use backfill::{BackfillProcessor, BackfillSummary};
pub use error::{Error, Result};
pub use processor::{EventProcessor, ProcessOutcome};
pub use resolver::{ResolverConfig, RootParentResolver};

#[cfg(test)]
mod tests;
