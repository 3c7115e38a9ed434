//! Protocol-native identifiers.
//!
//! An account is identified by its `fid`; a message by the digest of its
//! content. Byte fields (hashes, on-chain addresses) are canonicalized to
//! a `0x`-prefixed lowercase hex string at decode time, so every
//! downstream comparison is plain string equality.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A Farcaster account identifier.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Fid(pub u64);

impl fmt::Display for Fid {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

impl From<u64> for Fid {
  fn from(value: u64) -> Self { Self(value) }
}

/// Canonicalize a hex string (with or without a `0x`/`0X` prefix, any
/// case) to the `0x`-prefixed lowercase form stored and compared
/// everywhere. Returns `None` if the input is not hex.
pub fn canonical_hex(s: &str) -> Option<String> {
  let stripped = s
    .strip_prefix("0x")
    .or_else(|| s.strip_prefix("0X"))
    .unwrap_or(s);
  if stripped.is_empty() || !stripped.bytes().all(|b| b.is_ascii_hexdigit()) {
    return None;
  }
  Some(format!("0x{}", stripped.to_ascii_lowercase()))
}

/// Encode raw bytes as a canonical hex string.
pub fn hex_of(bytes: &[u8]) -> String { format!("0x{}", hex::encode(bytes)) }

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn canonical_hex_lowercases_and_prefixes() {
    assert_eq!(
      canonical_hex("0XABCDEF12").as_deref(),
      Some("0xabcdef12")
    );
    assert_eq!(canonical_hex("abCD01").as_deref(), Some("0xabcd01"));
  }

  #[test]
  fn canonical_hex_rejects_non_hex() {
    assert_eq!(canonical_hex("not-hex"), None);
    assert_eq!(canonical_hex(""), None);
    assert_eq!(canonical_hex("0x"), None);
  }

  #[test]
  fn hex_of_roundtrips_through_canonical() {
    let encoded = hex_of(&[0xde, 0xad, 0xbe, 0xef]);
    assert_eq!(encoded, "0xdeadbeef");
    assert_eq!(canonical_hex(&encoded).as_deref(), Some("0xdeadbeef"));
  }
}
