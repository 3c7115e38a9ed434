//! Normalized entity records — the relational shape of Hub messages.
//!
//! Records are produced by the decoder, written through the
//! [`IngestStore`](crate::store::IngestStore) and republished inside
//! [`DomainEvent`](crate::event::DomainEvent)s. Removal never deletes a
//! row: lifecycle is tracked with a nullable `deleted_at` timestamp so
//! history and audit survive. User-data and username proofs are the
//! exception — single-valued, last-write-wins, no soft-delete state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::Fid;

// ─── Soft delete ─────────────────────────────────────────────────────────────

/// Lifecycle predicate for records that soft-delete.
///
/// The `deleted_at` column is the single source of truth; every liveness
/// check in the system goes through this trait.
pub trait SoftDeletable {
  fn deleted_at(&self) -> Option<DateTime<Utc>>;

  fn is_active(&self) -> bool { self.deleted_at().is_none() }
}

// ─── Casts ───────────────────────────────────────────────────────────────────

/// The direct parent of a reply: the parent cast's author and hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastParent {
  pub fid:  Fid,
  pub hash: String,
}

/// The resolved top-most ancestor of a reply thread.
///
/// All fields stay `None` when the ancestry could not be resolved (a
/// missing parent on the Hub is expected, not a corruption). Once
/// resolved, the values are immutable — later writes never re-resolve.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootParent {
  pub fid:  Option<Fid>,
  pub hash: Option<String>,
  pub url:  Option<String>,
}

/// One embedded reference inside a cast body, in body order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CastEmbed {
  /// An external URL.
  Url { url: String },
  /// A quoted cast.
  Cast { fid: Fid, hash: String },
}

/// An @-mention. `position` is the byte offset into the UTF-8 encoding of
/// the cast text, exactly as given by the protocol — never recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastMention {
  pub fid:      Fid,
  pub position: u32,
}

/// A post or reply. Embed and mention child rows are owned by the cast
/// and soft-deleted in lockstep with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cast {
  pub hash:        String,
  pub fid:         Fid,
  pub text:        String,
  /// Set when the cast is a reply.
  pub parent:      Option<CastParent>,
  /// Channel/topic identifier; set when the cast is channel-scoped.
  pub parent_url:  Option<String>,
  pub root_parent: RootParent,
  pub embeds:      Vec<CastEmbed>,
  pub mentions:    Vec<CastMention>,
  pub timestamp:   DateTime<Utc>,
  pub deleted_at:  Option<DateTime<Utc>>,
}

impl Cast {
  pub fn is_reply(&self) -> bool { self.parent.is_some() }
}

impl SoftDeletable for Cast {
  fn deleted_at(&self) -> Option<DateTime<Utc>> { self.deleted_at }
}

/// A decoded cast-remove message. Carries only the target key and the
/// removal timestamp — everything else is read from the stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastRemove {
  pub fid:         Fid,
  pub target_hash: String,
  pub timestamp:   DateTime<Utc>,
}

// ─── Reactions ───────────────────────────────────────────────────────────────

/// A reaction's kind. The protocol wire value is 1 for likes and 2 for
/// recasts; the derived-counter columns each kind maintains live in
/// [`stat_fields`](ReactionKind::stat_fields).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
  Like,
  Recast,
}

/// What a reaction points at: another cast or an external URL.
///
/// Only cast targets maintain derived counters; URL reactions are
/// persisted with the same lifecycle but no stat side effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReactionTarget {
  Cast { fid: Fid, hash: String },
  Url { url: String },
}

/// A directed fid → target reaction, uniquely keyed by
/// `(target, kind, fid)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
  pub kind:       ReactionKind,
  pub fid:        Fid,
  pub target:     ReactionTarget,
  pub timestamp:  DateTime<Utc>,
  pub deleted_at: Option<DateTime<Utc>>,
}

impl SoftDeletable for Reaction {
  fn deleted_at(&self) -> Option<DateTime<Utc>> { self.deleted_at }
}

/// A decoded reaction-remove message. The target carries the unique key
/// only; stat decrements and the published removal event source their
/// remaining fields from the stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionRemove {
  pub kind:      ReactionKind,
  pub fid:       Fid,
  pub target:    ReactionTarget,
  pub timestamp: DateTime<Utc>,
}

// ─── Links ───────────────────────────────────────────────────────────────────

/// The one link type with derived-counter side effects.
pub const LINK_TYPE_FOLLOW: &str = "follow";

/// A directed relationship between two accounts, uniquely keyed by
/// `(fid, link_type, target_fid)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
  pub fid:        Fid,
  pub link_type:  String,
  pub target_fid: Fid,
  pub timestamp:  DateTime<Utc>,
  pub deleted_at: Option<DateTime<Utc>>,
}

impl Link {
  pub fn is_follow(&self) -> bool { self.link_type == LINK_TYPE_FOLLOW }
}

impl SoftDeletable for Link {
  fn deleted_at(&self) -> Option<DateTime<Utc>> { self.deleted_at }
}

/// A decoded link-remove message (unique key + removal timestamp).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRemove {
  pub fid:        Fid,
  pub link_type:  String,
  pub target_fid: Fid,
  pub timestamp:  DateTime<Utc>,
}

// ─── Verifications ───────────────────────────────────────────────────────────

/// The chain a verified address lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationProtocol {
  Ethereum,
  Solana,
}

/// Proof that an account controls an on-chain address, uniquely keyed by
/// `(fid, address)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
  pub fid:        Fid,
  pub address:    String,
  pub protocol:   VerificationProtocol,
  pub timestamp:  DateTime<Utc>,
  pub deleted_at: Option<DateTime<Utc>>,
}

impl SoftDeletable for Verification {
  fn deleted_at(&self) -> Option<DateTime<Utc>> { self.deleted_at }
}

/// A decoded verification-remove message (unique key + timestamp).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRemove {
  pub fid:       Fid,
  pub address:   String,
  pub timestamp: DateTime<Utc>,
}

// ─── User data ───────────────────────────────────────────────────────────────

/// Single-valued profile fields, uniquely keyed by `(fid, kind)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserDataKind {
  Pfp,
  Display,
  Bio,
  Url,
  Username,
  Location,
}

/// A profile field value. Always overwritten (last-write-wins), never
/// soft-deleted; the protocol has no remove message for this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
  pub fid:       Fid,
  pub kind:      UserDataKind,
  pub value:     String,
  pub timestamp: DateTime<Utc>,
}

// ─── Username proofs ─────────────────────────────────────────────────────────

/// Maps a human-readable username to an fid at a point in time. Uniquely
/// keyed by `username`; upserted last-write-wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsernameProof {
  pub username:  String,
  pub fid:       Fid,
  /// The owning address, canonicalized like every other byte field.
  pub owner:     String,
  /// Unix-epoch based, unlike every other message timestamp.
  pub timestamp: DateTime<Utc>,
}

// ─── Decoded message ─────────────────────────────────────────────────────────

/// A fully decoded, normalized Hub message, ready for the processor.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedMessage {
  CastAdd(Cast),
  CastRemove(CastRemove),
  ReactionAdd(Reaction),
  ReactionRemove(ReactionRemove),
  LinkAdd(Link),
  LinkRemove(LinkRemove),
  VerificationAdd(Verification),
  VerificationRemove(VerificationRemove),
  UserDataAdd(UserData),
  UsernameProof(UsernameProof),
}
