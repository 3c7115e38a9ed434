//! Integration tests for `SqliteStore` against an in-memory database.

use castline_core::{
  id::Fid,
  record::{
    Cast, CastEmbed, CastMention, CastParent, Link, Reaction, ReactionKind,
    ReactionTarget, RootParent, SoftDeletable as _, UserData, UserDataKind,
    UsernameProof, Verification, VerificationProtocol,
  },
  stats::{CastStatField, ParentUrlStatField, StatDelta, UserStatField},
  store::{IngestStore, WriteOutcome},
};
use chrono::{DateTime, TimeZone as _, Utc};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn at(secs: i64) -> DateTime<Utc> {
  Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn cast(hash: &str, fid: u64) -> Cast {
  Cast {
    hash:        hash.to_string(),
    fid:         Fid(fid),
    text:        "hello world".to_string(),
    parent:      None,
    parent_url:  None,
    root_parent: RootParent::default(),
    embeds:      Vec::new(),
    mentions:    Vec::new(),
    timestamp:   at(0),
    deleted_at:  None,
  }
}

fn like(target_hash: &str, target_fid: u64, fid: u64) -> Reaction {
  Reaction {
    kind:       ReactionKind::Like,
    fid:        Fid(fid),
    target:     ReactionTarget::Cast {
      fid:  Fid(target_fid),
      hash: target_hash.to_string(),
    },
    timestamp:  at(0),
    deleted_at: None,
  }
}

fn follow(fid: u64, target_fid: u64) -> Link {
  Link {
    fid:        Fid(fid),
    link_type:  "follow".to_string(),
    target_fid: Fid(target_fid),
    timestamp:  at(0),
    deleted_at: None,
  }
}

// ─── Cast upserts ────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_cast_then_duplicate() {
  let s = store().await;

  let c = cast("0xaa", 1);
  assert_eq!(s.upsert_cast(&c).await.unwrap(), WriteOutcome::Inserted);
  assert_eq!(s.upsert_cast(&c).await.unwrap(), WriteOutcome::Duplicate);

  let stored = s.get_cast("0xaa").await.unwrap().unwrap();
  assert!(stored.is_active());
  assert_eq!(stored.fid, Fid(1));
  assert_eq!(stored.text, "hello world");
}

#[tokio::test]
async fn get_cast_missing_returns_none() {
  let s = store().await;
  assert!(s.get_cast("0xnothing").await.unwrap().is_none());
}

#[tokio::test]
async fn upsert_cast_resurrects_soft_deleted() {
  let s = store().await;

  let c = cast("0xaa", 1);
  s.upsert_cast(&c).await.unwrap();
  s.soft_delete_cast("0xaa", at(10)).await.unwrap().unwrap();

  assert_eq!(s.upsert_cast(&c).await.unwrap(), WriteOutcome::Resurrected);
  let stored = s.get_cast("0xaa").await.unwrap().unwrap();
  assert!(stored.is_active());
}

#[tokio::test]
async fn resurrect_keeps_resolved_root() {
  let s = store().await;

  let mut c = cast("0xaa", 1);
  c.parent = Some(CastParent { fid: Fid(2), hash: "0xbb".into() });
  c.root_parent = RootParent {
    fid:  Some(Fid(3)),
    hash: Some("0xcc".into()),
    url:  None,
  };
  s.upsert_cast(&c).await.unwrap();
  s.soft_delete_cast("0xaa", at(10)).await.unwrap();

  // A later write must not re-resolve the root.
  let mut replay = c.clone();
  replay.root_parent = RootParent {
    fid:  Some(Fid(99)),
    hash: Some("0xffff".into()),
    url:  Some("chain://bogus".into()),
  };
  assert_eq!(
    s.upsert_cast(&replay).await.unwrap(),
    WriteOutcome::Resurrected
  );

  let stored = s.get_cast("0xaa").await.unwrap().unwrap();
  assert_eq!(stored.root_parent.fid, Some(Fid(3)));
  assert_eq!(stored.root_parent.hash.as_deref(), Some("0xcc"));
}

// ─── Cast soft delete ────────────────────────────────────────────────────────

#[tokio::test]
async fn soft_delete_cast_returns_children_and_marks_them() {
  let s = store().await;

  let mut c = cast("0xaa", 1);
  c.embeds = vec![
    CastEmbed::Url { url: "https://a.example".into() },
    CastEmbed::Cast { fid: Fid(5), hash: "0xee".into() },
  ];
  c.mentions = vec![CastMention { fid: Fid(9), position: 4 }];
  s.upsert_cast(&c).await.unwrap();

  let removed = s.soft_delete_cast("0xaa", at(10)).await.unwrap().unwrap();
  assert_eq!(removed.deleted_at, Some(at(10)));
  assert_eq!(removed.embeds.len(), 2);
  assert_eq!(removed.mentions.len(), 1);

  // Still retrievable: soft delete preserves history.
  let stored = s.get_cast("0xaa").await.unwrap().unwrap();
  assert!(!stored.is_active());
  assert_eq!(stored.embeds, removed.embeds);
}

#[tokio::test]
async fn soft_delete_cast_twice_is_a_noop() {
  let s = store().await;
  s.upsert_cast(&cast("0xaa", 1)).await.unwrap();

  assert!(s.soft_delete_cast("0xaa", at(1)).await.unwrap().is_some());
  assert!(s.soft_delete_cast("0xaa", at(2)).await.unwrap().is_none());
  assert!(s.soft_delete_cast("0xmissing", at(3)).await.unwrap().is_none());
}

// ─── Reactions ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn reaction_upsert_duplicate_and_soft_delete() {
  let s = store().await;

  let r = like("0xaa", 2, 7);
  assert_eq!(s.upsert_reaction(&r).await.unwrap(), WriteOutcome::Inserted);
  assert_eq!(s.upsert_reaction(&r).await.unwrap(), WriteOutcome::Duplicate);

  let removed = s
    .soft_delete_reaction(ReactionKind::Like, Fid(7), &r.target, at(5))
    .await
    .unwrap()
    .unwrap();
  // The stored row supplies the target author, which removes don't carry.
  assert!(matches!(
    removed.target,
    ReactionTarget::Cast { fid: Fid(2), .. }
  ));
  assert!(!removed.is_active());

  let again = s
    .soft_delete_reaction(ReactionKind::Like, Fid(7), &r.target, at(6))
    .await
    .unwrap();
  assert!(again.is_none());
}

#[tokio::test]
async fn url_reaction_roundtrip() {
  let s = store().await;

  let r = Reaction {
    kind:       ReactionKind::Recast,
    fid:        Fid(7),
    target:     ReactionTarget::Url { url: "https://warpcast.com/x".into() },
    timestamp:  at(0),
    deleted_at: None,
  };
  assert_eq!(s.upsert_reaction(&r).await.unwrap(), WriteOutcome::Inserted);

  let stored = s
    .get_reaction(ReactionKind::Recast, Fid(7), &r.target)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(stored.target, r.target);
}

// ─── Links ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn link_soft_delete_preserves_row() {
  let s = store().await;

  let l = follow(1, 2);
  s.upsert_link(&l).await.unwrap();
  let removed = s
    .soft_delete_link(Fid(1), "follow", Fid(2), at(9))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(removed.deleted_at, Some(at(9)));

  // The record survives with its deletion marker set.
  let stored = s.get_link(Fid(1), "follow", Fid(2)).await.unwrap().unwrap();
  assert!(!stored.is_active());
  assert_eq!(stored.target_fid, Fid(2));
}

#[tokio::test]
async fn link_readd_after_remove_resurrects() {
  let s = store().await;

  let l = follow(1, 2);
  s.upsert_link(&l).await.unwrap();
  s.soft_delete_link(Fid(1), "follow", Fid(2), at(9))
    .await
    .unwrap();
  assert_eq!(s.upsert_link(&l).await.unwrap(), WriteOutcome::Resurrected);
  assert!(
    s.get_link(Fid(1), "follow", Fid(2))
      .await
      .unwrap()
      .unwrap()
      .is_active()
  );
}

// ─── Verifications ───────────────────────────────────────────────────────────

#[tokio::test]
async fn verification_keyed_by_fid_and_address() {
  let s = store().await;

  let v = Verification {
    fid:        Fid(4),
    address:    "0xdeadbeef".into(),
    protocol:   VerificationProtocol::Ethereum,
    timestamp:  at(0),
    deleted_at: None,
  };
  assert_eq!(s.upsert_verification(&v).await.unwrap(), WriteOutcome::Inserted);
  assert_eq!(s.upsert_verification(&v).await.unwrap(), WriteOutcome::Duplicate);

  let removed = s
    .soft_delete_verification(Fid(4), "0xdeadbeef", at(3))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(removed.protocol, VerificationProtocol::Ethereum);

  assert_eq!(
    s.upsert_verification(&v).await.unwrap(),
    WriteOutcome::Resurrected
  );
}

// ─── User data / username proofs ─────────────────────────────────────────────

#[tokio::test]
async fn user_data_last_write_wins() {
  let s = store().await;

  let first = UserData {
    fid:       Fid(3),
    kind:      UserDataKind::Display,
    value:     "Alice".into(),
    timestamp: at(0),
  };
  assert_eq!(s.upsert_user_data(&first).await.unwrap(), WriteOutcome::Inserted);

  // Exact redelivery is a duplicate.
  assert_eq!(
    s.upsert_user_data(&first).await.unwrap(),
    WriteOutcome::Duplicate
  );

  // A newer value overwrites.
  let newer = UserData { value: "Alice L.".into(), timestamp: at(5), ..first.clone() };
  assert_eq!(s.upsert_user_data(&newer).await.unwrap(), WriteOutcome::Inserted);

  // A stale write is superseded by stored state.
  let stale = UserData { value: "Old Alice".into(), timestamp: at(1), ..first.clone() };
  assert_eq!(s.upsert_user_data(&stale).await.unwrap(), WriteOutcome::Duplicate);

  let stored = s
    .get_user_data(Fid(3), UserDataKind::Display)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(stored.value, "Alice L.");
}

#[tokio::test]
async fn username_proof_last_write_wins() {
  let s = store().await;

  let proof = UsernameProof {
    username:  "alice".into(),
    fid:       Fid(3),
    owner:     "0xfeed".into(),
    timestamp: at(0),
  };
  assert_eq!(
    s.upsert_username_proof(&proof).await.unwrap(),
    WriteOutcome::Inserted
  );
  assert_eq!(
    s.upsert_username_proof(&proof).await.unwrap(),
    WriteOutcome::Duplicate
  );

  // The username moves to a new fid later.
  let moved = UsernameProof { fid: Fid(44), timestamp: at(60), ..proof.clone() };
  assert_eq!(
    s.upsert_username_proof(&moved).await.unwrap(),
    WriteOutcome::Inserted
  );
  let stored = s.get_username_proof("alice").await.unwrap().unwrap();
  assert_eq!(stored.fid, Fid(44));
}

// ─── Derived counters ────────────────────────────────────────────────────────

#[tokio::test]
async fn stat_deltas_accumulate() {
  let s = store().await;

  s.apply_stat_deltas(&[
    StatDelta::Cast {
      hash:  "0xaa".into(),
      field: CastStatField::Likes,
      delta: 1,
    },
    StatDelta::Cast {
      hash:  "0xaa".into(),
      field: CastStatField::Likes,
      delta: 1,
    },
    StatDelta::Cast {
      hash:  "0xaa".into(),
      field: CastStatField::Replies,
      delta: 1,
    },
    StatDelta::User {
      fid:   Fid(1),
      field: UserStatField::Following,
      delta: 1,
    },
    StatDelta::ParentUrl {
      url:   "chain://eip155:1".into(),
      field: ParentUrlStatField::Casts,
      delta: 1,
    },
  ])
  .await
  .unwrap();

  let cs = s.cast_stats("0xaa").await.unwrap();
  assert_eq!(cs.likes, 2);
  assert_eq!(cs.replies, 1);
  assert_eq!(cs.recasts, 0);

  assert_eq!(s.user_stats(Fid(1)).await.unwrap().following, 1);
  assert_eq!(
    s.parent_url_stats("chain://eip155:1").await.unwrap().casts,
    1
  );
}

#[tokio::test]
async fn stat_counters_floor_at_zero() {
  let s = store().await;

  s.apply_stat_deltas(&[StatDelta::Cast {
    hash:  "0xaa".into(),
    field: CastStatField::Likes,
    delta: -5,
  }])
  .await
  .unwrap();
  assert_eq!(s.cast_stats("0xaa").await.unwrap().likes, 0);

  s.apply_stat_deltas(&[
    StatDelta::User { fid: Fid(1), field: UserStatField::Casts, delta: 2 },
    StatDelta::User { fid: Fid(1), field: UserStatField::Casts, delta: -3 },
  ])
  .await
  .unwrap();
  assert_eq!(s.user_stats(Fid(1)).await.unwrap().casts, 0);
}

#[tokio::test]
async fn missing_stat_rows_read_as_zero() {
  let s = store().await;
  assert_eq!(s.cast_stats("0xnope").await.unwrap().likes, 0);
  assert_eq!(s.user_stats(Fid(404)).await.unwrap().followers, 0);
  assert_eq!(s.parent_url_stats("chain://x").await.unwrap().replies, 0);
}

// ─── Bulk inserts ────────────────────────────────────────────────────────────

#[tokio::test]
async fn bulk_insert_casts_skips_existing() {
  let s = store().await;

  s.upsert_cast(&cast("0xaa", 1)).await.unwrap();

  let batch = vec![cast("0xaa", 1), cast("0xbb", 1), cast("0xcc", 2)];
  let written = s.insert_casts_skip_duplicates(&batch).await.unwrap();
  assert_eq!(written, 2);

  assert!(s.get_cast("0xbb").await.unwrap().is_some());
  assert!(s.get_cast("0xcc").await.unwrap().is_some());
}

#[tokio::test]
async fn bulk_insert_links_and_reactions_skip_existing() {
  let s = store().await;

  s.upsert_link(&follow(1, 2)).await.unwrap();
  let links = vec![follow(1, 2), follow(1, 3)];
  assert_eq!(s.insert_links_skip_duplicates(&links).await.unwrap(), 1);

  s.upsert_reaction(&like("0xaa", 2, 7)).await.unwrap();
  let reactions = vec![like("0xaa", 2, 7), like("0xbb", 3, 7)];
  assert_eq!(
    s.insert_reactions_skip_duplicates(&reactions).await.unwrap(),
    1
  );
}
