//! Error type for `castline-ingest`.
//!
//! Store and hub errors cross this boundary boxed, so the processor stays
//! generic over its collaborators. Everything here is a retryable failure
//! of the single message or page being processed — the queue driving the
//! processor owns backoff and redelivery.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("hub error: {0}")]
  Hub(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("hub call timed out after {0:?}")]
  HubTimeout(Duration),

  /// The root-parent walk exceeded its defensive hop bound. This means a
  /// cyclic or corrupted thread, and fails loudly rather than truncating.
  #[error("thread ancestry exceeded {0} hops; cyclic or corrupted thread")]
  ThreadDepthExceeded(usize),
}

impl Error {
  pub(crate) fn store<E>(error: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(error))
  }

  pub(crate) fn hub<E>(error: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Hub(Box::new(error))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
