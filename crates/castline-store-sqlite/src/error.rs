//! Error type for `castline-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown discriminant: {0:?}")]
  UnknownDiscriminant(String),

  /// A stored row violates the data model (e.g. a reaction row with no
  /// target). Indicates a schema invariant bug, not a runtime condition.
  #[error("malformed row: {0}")]
  MalformedRow(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
