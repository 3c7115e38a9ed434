//! Derived-counter bookkeeping.
//!
//! Counters are a derived cache, not authoritative state: they must track
//! entity lifecycle exactly — increment on add, decrement on the
//! corresponding remove — and the processor's duplicate detection is what
//! keeps them from drifting under redelivery. Columns are addressed
//! through these enums so the compiler checks exhaustiveness; there is no
//! string-keyed field access anywhere.

use serde::{Deserialize, Serialize};

use crate::{id::Fid, record::ReactionKind};

// ─── Stat fields ─────────────────────────────────────────────────────────────

/// Per-cast counter columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastStatField {
  Likes,
  Recasts,
  Replies,
  Quotes,
}

impl CastStatField {
  /// The column name in the backing store.
  pub fn column(self) -> &'static str {
    match self {
      Self::Likes => "likes",
      Self::Recasts => "recasts",
      Self::Replies => "replies",
      Self::Quotes => "quotes",
    }
  }
}

/// Per-account counter columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatField {
  Casts,
  Replies,
  RepliesReceived,
  Likes,
  LikesReceived,
  Recasts,
  RecastsReceived,
  Following,
  Followers,
}

impl UserStatField {
  pub fn column(self) -> &'static str {
    match self {
      Self::Casts => "casts",
      Self::Replies => "replies",
      Self::RepliesReceived => "replies_received",
      Self::Likes => "likes",
      Self::LikesReceived => "likes_received",
      Self::Recasts => "recasts",
      Self::RecastsReceived => "recasts_received",
      Self::Following => "following",
      Self::Followers => "followers",
    }
  }
}

/// Per-channel-URL counter columns, used for channel activity ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentUrlStatField {
  Casts,
  Replies,
}

impl ParentUrlStatField {
  pub fn column(self) -> &'static str {
    match self {
      Self::Casts => "casts",
      Self::Replies => "replies",
    }
  }
}

// ─── Reaction → stat mapping ─────────────────────────────────────────────────

/// The three counters a reaction kind maintains: one on the target cast,
/// one on the reacting account, one on the target cast's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionStatFields {
  pub cast:     CastStatField,
  pub given:    UserStatField,
  pub received: UserStatField,
}

impl ReactionKind {
  pub fn stat_fields(self) -> ReactionStatFields {
    match self {
      Self::Like => ReactionStatFields {
        cast:     CastStatField::Likes,
        given:    UserStatField::Likes,
        received: UserStatField::LikesReceived,
      },
      Self::Recast => ReactionStatFields {
        cast:     CastStatField::Recasts,
        given:    UserStatField::Recasts,
        received: UserStatField::RecastsReceived,
      },
    }
  }
}

// ─── Write unit ──────────────────────────────────────────────────────────────

/// One increment or decrement against a counter row. The store applies a
/// batch of these atomically; counters floor at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatDelta {
  Cast {
    hash:  String,
    field: CastStatField,
    delta: i64,
  },
  User {
    fid:   Fid,
    field: UserStatField,
    delta: i64,
  },
  ParentUrl {
    url:   String,
    field: ParentUrlStatField,
    delta: i64,
  },
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// Counter snapshot for one cast. A missing row reads as all zeros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastStats {
  pub likes:   i64,
  pub recasts: i64,
  pub replies: i64,
  pub quotes:  i64,
}

/// Counter snapshot for one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
  pub casts:            i64,
  pub replies:          i64,
  pub replies_received: i64,
  pub likes:            i64,
  pub likes_received:   i64,
  pub recasts:          i64,
  pub recasts_received: i64,
  pub following:        i64,
  pub followers:        i64,
}

/// Counter snapshot for one channel URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentUrlStats {
  pub casts:   i64,
  pub replies: i64,
}
