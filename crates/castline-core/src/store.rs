//! The `IngestStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g.
//! `castline-store-sqlite`). The processor and backfill components depend
//! on this abstraction, not on any concrete backend.
//!
//! Every write keys on the entity's natural unique key and performs its
//! existence check inside the backend's own transaction — two workers
//! racing on the same key must never both observe "absent". All methods
//! return `Send` futures so the trait can be used in multi-threaded async
//! runtimes.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  id::Fid,
  record::{
    Cast, Link, Reaction, ReactionKind, ReactionTarget, UserData,
    UserDataKind, UsernameProof, Verification,
  },
  stats::{CastStats, ParentUrlStats, StatDelta, UserStats},
};

// ─── Write outcome ───────────────────────────────────────────────────────────

/// Result of a unique-key upsert.
///
/// `Duplicate` means the stored state already covers the message: the
/// write was a no-op, and the caller must apply no stat side effects and
/// publish no event. This is the mechanism that makes processing
/// idempotent under at-least-once redelivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
  /// No record existed under the key; a new row was written.
  Inserted,
  /// A soft-deleted record existed; it was overwritten and its deletion
  /// marker cleared. Re-adding after removal is a valid transition.
  Resurrected,
  /// An active record already covered the key; nothing was written.
  Duplicate,
}

impl WriteOutcome {
  /// Whether the message changed stored state (and so the caller should
  /// apply stat side effects and publish).
  pub fn applied(self) -> bool { !matches!(self, Self::Duplicate) }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the relational store backing the ingestion pipeline.
pub trait IngestStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Casts ─────────────────────────────────────────────────────────────

  /// Upsert a cast and its embed/mention child rows under the cast hash.
  ///
  /// On resurrect, already-resolved root-parent fields are kept — roots
  /// are resolved once and immutable thereafter.
  fn upsert_cast<'a>(
    &'a self,
    cast: &'a Cast,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;

  /// Fetch a cast (with child rows) by hash, whether active or deleted.
  fn get_cast<'a>(
    &'a self,
    hash: &'a str,
  ) -> impl Future<Output = Result<Option<Cast>, Self::Error>> + Send + 'a;

  /// Soft-delete an active cast together with its embed/mention child
  /// rows, in one operation. Returns the record as it was stored (child
  /// rows included, `deleted_at` now set), or `None` if the cast is
  /// absent or already deleted (a duplicate remove).
  fn soft_delete_cast<'a>(
    &'a self,
    hash: &'a str,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Cast>, Self::Error>> + Send + 'a;

  /// Bulk insert for backfill: skips rows whose unique key already
  /// exists, touches no counters. Returns the number of rows written.
  fn insert_casts_skip_duplicates<'a>(
    &'a self,
    casts: &'a [Cast],
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  // ── Reactions ─────────────────────────────────────────────────────────

  fn upsert_reaction<'a>(
    &'a self,
    reaction: &'a Reaction,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;

  fn get_reaction<'a>(
    &'a self,
    kind: ReactionKind,
    fid: Fid,
    target: &'a ReactionTarget,
  ) -> impl Future<Output = Result<Option<Reaction>, Self::Error>> + Send + 'a;

  /// Soft-delete by unique key. The returned record carries the stored
  /// target (including the target cast's author, which remove messages
  /// do not carry).
  fn soft_delete_reaction<'a>(
    &'a self,
    kind: ReactionKind,
    fid: Fid,
    target: &'a ReactionTarget,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Reaction>, Self::Error>> + Send + 'a;

  fn insert_reactions_skip_duplicates<'a>(
    &'a self,
    reactions: &'a [Reaction],
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  // ── Links ─────────────────────────────────────────────────────────────

  fn upsert_link<'a>(
    &'a self,
    link: &'a Link,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;

  fn get_link<'a>(
    &'a self,
    fid: Fid,
    link_type: &'a str,
    target_fid: Fid,
  ) -> impl Future<Output = Result<Option<Link>, Self::Error>> + Send + 'a;

  fn soft_delete_link<'a>(
    &'a self,
    fid: Fid,
    link_type: &'a str,
    target_fid: Fid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Link>, Self::Error>> + Send + 'a;

  fn insert_links_skip_duplicates<'a>(
    &'a self,
    links: &'a [Link],
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  // ── Verifications ─────────────────────────────────────────────────────

  fn upsert_verification<'a>(
    &'a self,
    verification: &'a Verification,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;

  fn get_verification<'a>(
    &'a self,
    fid: Fid,
    address: &'a str,
  ) -> impl Future<Output = Result<Option<Verification>, Self::Error>> + Send + 'a;

  fn soft_delete_verification<'a>(
    &'a self,
    fid: Fid,
    address: &'a str,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Verification>, Self::Error>> + Send + 'a;

  fn insert_verifications_skip_duplicates<'a>(
    &'a self,
    verifications: &'a [Verification],
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  // ── User data / username proofs — last-write-wins ─────────────────────

  /// Upsert a profile field. Returns `Inserted` when the value was
  /// written (fresh row or overwrite), `Duplicate` when the stored row
  /// already supersedes the message — a strictly newer stored timestamp,
  /// or an identical value at the same timestamp (exact redelivery).
  fn upsert_user_data<'a>(
    &'a self,
    data: &'a UserData,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;

  fn get_user_data<'a>(
    &'a self,
    fid: Fid,
    kind: UserDataKind,
  ) -> impl Future<Output = Result<Option<UserData>, Self::Error>> + Send + 'a;

  fn insert_user_data_skip_duplicates<'a>(
    &'a self,
    data: &'a [UserData],
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Upsert a username proof; same last-write-wins contract as
  /// [`upsert_user_data`](IngestStore::upsert_user_data).
  fn upsert_username_proof<'a>(
    &'a self,
    proof: &'a UsernameProof,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;

  fn get_username_proof<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<UsernameProof>, Self::Error>> + Send + 'a;

  fn insert_username_proofs_skip_duplicates<'a>(
    &'a self,
    proofs: &'a [UsernameProof],
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  // ── Derived counters ──────────────────────────────────────────────────

  /// Apply a batch of increments/decrements as one atomic unit. Either
  /// every delta lands or none does; counters never go below zero.
  fn apply_stat_deltas<'a>(
    &'a self,
    deltas: &'a [StatDelta],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Counter snapshot for a cast; a missing row reads as zeros.
  fn cast_stats<'a>(
    &'a self,
    hash: &'a str,
  ) -> impl Future<Output = Result<CastStats, Self::Error>> + Send + 'a;

  /// Counter snapshot for an account; a missing row reads as zeros.
  fn user_stats(
    &self,
    fid: Fid,
  ) -> impl Future<Output = Result<UserStats, Self::Error>> + Send + '_;

  /// Counter snapshot for a channel URL; a missing row reads as zeros.
  fn parent_url_stats<'a>(
    &'a self,
    url: &'a str,
  ) -> impl Future<Output = Result<ParentUrlStats, Self::Error>> + Send + 'a;
}
