//! Farcaster epoch time conversion.
//!
//! Protocol message timestamps are unsigned second offsets from the
//! Farcaster epoch (2021-01-01T00:00:00Z), not the Unix epoch. Username
//! proofs are the exception: the protocol stamps them with plain Unix
//! seconds.

use chrono::{DateTime, Utc};

/// Seconds between the Unix epoch and the Farcaster epoch
/// (2021-01-01T00:00:00Z).
pub const FARCASTER_EPOCH_SECS: i64 = 1_609_459_200;

/// Convert a protocol-relative timestamp to wall-clock time.
pub fn from_farcaster_time(secs: u32) -> DateTime<Utc> {
  DateTime::from_timestamp(FARCASTER_EPOCH_SECS + i64::from(secs), 0)
    .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Convert Unix seconds to wall-clock time. Out-of-range values clamp to
/// the Unix epoch rather than failing; the protocol does not produce them.
pub fn from_unix_time(secs: u64) -> DateTime<Utc> {
  i64::try_from(secs)
    .ok()
    .and_then(|s| DateTime::from_timestamp(s, 0))
    .unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn farcaster_time_zero_is_the_epoch() {
    assert_eq!(
      from_farcaster_time(0).to_rfc3339(),
      "2021-01-01T00:00:00+00:00"
    );
  }

  #[test]
  fn farcaster_time_offsets_forward() {
    let at = from_farcaster_time(86_400);
    assert_eq!(at.to_rfc3339(), "2021-01-02T00:00:00+00:00");
  }

  #[test]
  fn unix_time_passes_through() {
    assert_eq!(
      from_unix_time(1_609_459_200).to_rfc3339(),
      "2021-01-01T00:00:00+00:00"
    );
  }
}
