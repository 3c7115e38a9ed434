//! Integration tests for the processor, resolver and backfill against an
//! in-memory SQLite store, a fake Hub and a recording publisher.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
};

use castline_core::{
  event::DomainEvent,
  id::{Fid, canonical_hex},
  publish::EventPublisher,
  record::{CastEmbed, ReactionTarget, RootParent, SoftDeletable as _},
  store::IngestStore,
};
use castline_proto::{
  hub::HubClient,
  wire::{
    CastAddBody, CastId, CastRemoveBody, Embed, LinkBody, Message,
    MessageData, MessageType, MessagesPage, ReactionBody, ReactionType,
    UserDataBody, UserDataType, UserNameProofBody, VerificationAddBody,
    VerificationRemoveBody,
  },
};
use castline_store_sqlite::SqliteStore;

use crate::{
  BackfillProcessor, EventProcessor, ProcessOutcome, ResolverConfig,
  error::Error,
};

// ─── Message builders ────────────────────────────────────────────────────────

fn data_for(kind: MessageType, fid: u64, timestamp: u32) -> MessageData {
  MessageData {
    kind,
    fid,
    timestamp,
    network: None,
    cast_add_body: None,
    cast_remove_body: None,
    reaction_body: None,
    link_body: None,
    verification_add_address_body: None,
    verification_remove_body: None,
    user_data_body: None,
    username_proof_body: None,
  }
}

fn envelope(data: MessageData, hash: &str) -> Message {
  Message {
    data:        Some(data),
    hash:        Some(hash.to_string()),
    hash_scheme: None,
    signature:   None,
    signer:      None,
  }
}

fn cast_add(fid: u64, hash: &str, text: &str) -> Message {
  let mut data = data_for(MessageType::CastAdd, fid, 10);
  data.cast_add_body = Some(CastAddBody {
    text: Some(text.to_string()),
    ..CastAddBody::default()
  });
  envelope(data, hash)
}

fn channel_cast(fid: u64, hash: &str, url: &str) -> Message {
  let mut data = data_for(MessageType::CastAdd, fid, 10);
  data.cast_add_body = Some(CastAddBody {
    text: Some("channel post".to_string()),
    parent_url: Some(url.to_string()),
    ..CastAddBody::default()
  });
  envelope(data, hash)
}

fn reply_add(fid: u64, hash: &str, parent_fid: u64, parent_hash: &str) -> Message {
  let mut data = data_for(MessageType::CastAdd, fid, 20);
  data.cast_add_body = Some(CastAddBody {
    text: Some("a reply".to_string()),
    parent_cast_id: Some(CastId {
      fid:  parent_fid,
      hash: parent_hash.to_string(),
    }),
    ..CastAddBody::default()
  });
  envelope(data, hash)
}

fn cast_remove(fid: u64, target_hash: &str, timestamp: u32) -> Message {
  let mut data = data_for(MessageType::CastRemove, fid, timestamp);
  data.cast_remove_body = Some(CastRemoveBody {
    target_hash: Some(target_hash.to_string()),
  });
  envelope(data, "0x00")
}

fn reaction_message(
  kind: MessageType,
  reaction: ReactionType,
  fid: u64,
  target_fid: u64,
  target_hash: &str,
  timestamp: u32,
) -> Message {
  let mut data = data_for(kind, fid, timestamp);
  data.reaction_body = Some(ReactionBody {
    kind:           reaction,
    target_cast_id: Some(CastId {
      fid:  target_fid,
      hash: target_hash.to_string(),
    }),
    target_url:     None,
  });
  envelope(data, "0x00")
}

fn link_message(
  kind: MessageType,
  fid: u64,
  target_fid: u64,
  timestamp: u32,
) -> Message {
  let mut data = data_for(kind, fid, timestamp);
  data.link_body = Some(LinkBody {
    link_type:  Some("follow".to_string()),
    target_fid: Some(target_fid),
  });
  envelope(data, "0x00")
}

fn user_data_message(
  fid: u64,
  kind: UserDataType,
  value: &str,
  timestamp: u32,
) -> Message {
  let mut data = data_for(MessageType::UserDataAdd, fid, timestamp);
  data.user_data_body =
    Some(UserDataBody { kind, value: Some(value.to_string()) });
  envelope(data, "0x00")
}

// ─── Test doubles ────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("fake hub failure")]
struct FakeHubError;

#[derive(Clone, Default)]
struct FakeHub {
  inner: Arc<Mutex<FakeHubInner>>,
}

#[derive(Default)]
struct FakeHubInner {
  casts_by_hash:      HashMap<String, Message>,
  cast_pages:         Vec<Vec<Message>>,
  reaction_pages:     Vec<Vec<Message>>,
  link_pages:         Vec<Vec<Message>>,
  verification_pages: Vec<Vec<Message>>,
  user_data_pages:    Vec<Vec<Message>>,
  proof_pages:        Vec<Vec<Message>>,
}

impl FakeHub {
  fn add_cast(&self, message: Message) {
    let hash = canonical_hex(message.hash.as_deref().unwrap()).unwrap();
    self.inner.lock().unwrap().casts_by_hash.insert(hash, message);
  }

  fn set_cast_pages(&self, pages: Vec<Vec<Message>>) {
    self.inner.lock().unwrap().cast_pages = pages;
  }

  fn set_reaction_pages(&self, pages: Vec<Vec<Message>>) {
    self.inner.lock().unwrap().reaction_pages = pages;
  }

  fn set_link_pages(&self, pages: Vec<Vec<Message>>) {
    self.inner.lock().unwrap().link_pages = pages;
  }

  fn set_user_data_pages(&self, pages: Vec<Vec<Message>>) {
    self.inner.lock().unwrap().user_data_pages = pages;
  }
}

fn page_of(pages: &[Vec<Message>], token: Option<&str>) -> MessagesPage {
  let index: usize = token.and_then(|t| t.parse().ok()).unwrap_or(0);
  MessagesPage {
    messages:        pages.get(index).cloned().unwrap_or_default(),
    next_page_token: (index + 1 < pages.len()).then(|| (index + 1).to_string()),
  }
}

impl HubClient for FakeHub {
  type Error = FakeHubError;

  async fn cast_by_id(
    &self,
    _fid: Fid,
    hash: &str,
  ) -> Result<Option<Message>, FakeHubError> {
    Ok(self.inner.lock().unwrap().casts_by_hash.get(hash).cloned())
  }

  async fn casts_by_fid(
    &self,
    _fid: Fid,
    page_token: Option<&str>,
  ) -> Result<MessagesPage, FakeHubError> {
    Ok(page_of(&self.inner.lock().unwrap().cast_pages, page_token))
  }

  async fn reactions_by_fid(
    &self,
    _fid: Fid,
    page_token: Option<&str>,
  ) -> Result<MessagesPage, FakeHubError> {
    Ok(page_of(&self.inner.lock().unwrap().reaction_pages, page_token))
  }

  async fn links_by_fid(
    &self,
    _fid: Fid,
    page_token: Option<&str>,
  ) -> Result<MessagesPage, FakeHubError> {
    Ok(page_of(&self.inner.lock().unwrap().link_pages, page_token))
  }

  async fn verifications_by_fid(
    &self,
    _fid: Fid,
    page_token: Option<&str>,
  ) -> Result<MessagesPage, FakeHubError> {
    Ok(page_of(&self.inner.lock().unwrap().verification_pages, page_token))
  }

  async fn user_data_by_fid(
    &self,
    _fid: Fid,
    page_token: Option<&str>,
  ) -> Result<MessagesPage, FakeHubError> {
    Ok(page_of(&self.inner.lock().unwrap().user_data_pages, page_token))
  }

  async fn username_proofs_by_fid(
    &self,
    _fid: Fid,
    page_token: Option<&str>,
  ) -> Result<MessagesPage, FakeHubError> {
    Ok(page_of(&self.inner.lock().unwrap().proof_pages, page_token))
  }
}

#[derive(Clone, Default)]
struct RecordingPublisher {
  events: Arc<Mutex<Vec<(DomainEvent, bool)>>>,
}

impl RecordingPublisher {
  fn events(&self) -> Vec<(DomainEvent, bool)> {
    self.events.lock().unwrap().clone()
  }

  fn kinds(&self) -> Vec<&'static str> {
    self
      .events
      .lock()
      .unwrap()
      .iter()
      .map(|(event, _)| event.kind())
      .collect()
  }
}

impl EventPublisher for RecordingPublisher {
  async fn publish(&self, event: DomainEvent, high_priority: bool) {
    self.events.lock().unwrap().push((event, high_priority));
  }
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

type Fixture =
  (EventProcessor<SqliteStore, FakeHub, RecordingPublisher>, SqliteStore, RecordingPublisher);

async fn fixture(hub: FakeHub) -> Fixture {
  fixture_with_config(hub, ResolverConfig::default()).await
}

async fn fixture_with_config(hub: FakeHub, config: ResolverConfig) -> Fixture {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  let publisher = RecordingPublisher::default();
  let processor =
    EventProcessor::new(store.clone(), hub, publisher.clone(), config);
  (processor, store, publisher)
}

// ─── Casts ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn reply_add_increments_reply_stats_and_publishes() {
  let hub = FakeHub::default();
  hub.add_cast(cast_add(99, "0xa1", "the root"));
  let (processor, store, publisher) = fixture(hub).await;

  let outcome =
    processor.process(&reply_add(7, "0xb1", 99, "0xa1")).await.unwrap();
  assert_eq!(outcome, ProcessOutcome::Applied);

  assert_eq!(store.cast_stats("0xa1").await.unwrap().replies, 1);
  assert_eq!(store.user_stats(Fid(7)).await.unwrap().replies, 1);
  assert_eq!(store.user_stats(Fid(99)).await.unwrap().replies_received, 1);

  let events = publisher.events();
  assert_eq!(events.len(), 1);
  assert!(matches!(events[0].0, DomainEvent::CastAdded(_)));
  assert!(!events[0].1, "live ingestion publishes at normal priority");

  let stored = store.get_cast("0xb1").await.unwrap().unwrap();
  assert_eq!(stored.root_parent.fid, Some(Fid(99)));
  assert_eq!(stored.root_parent.hash.as_deref(), Some("0xa1"));
}

#[tokio::test]
async fn duplicate_cast_add_is_a_complete_noop() {
  let hub = FakeHub::default();
  hub.add_cast(cast_add(99, "0xa1", "the root"));
  let (processor, store, publisher) = fixture(hub).await;

  let message = reply_add(7, "0xb1", 99, "0xa1");
  assert_eq!(
    processor.process(&message).await.unwrap(),
    ProcessOutcome::Applied
  );
  assert_eq!(
    processor.process(&message).await.unwrap(),
    ProcessOutcome::Duplicate
  );

  assert_eq!(store.cast_stats("0xa1").await.unwrap().replies, 1);
  assert_eq!(store.user_stats(Fid(7)).await.unwrap().replies, 1);
  assert_eq!(publisher.events().len(), 1);
}

#[tokio::test]
async fn top_level_cast_counts_casts_and_channel_activity() {
  let (processor, store, publisher) =
    fixture(FakeHub::default()).await;

  processor
    .process(&channel_cast(5, "0xa1", "chain://farcaster/memes"))
    .await
    .unwrap();

  assert_eq!(store.user_stats(Fid(5)).await.unwrap().casts, 1);
  assert_eq!(
    store.parent_url_stats("chain://farcaster/memes").await.unwrap().casts,
    1
  );
  assert_eq!(publisher.kinds(), vec!["cast_added"]);

  // A channel-scoped top-level cast is its own root, in its channel.
  let stored = store.get_cast("0xa1").await.unwrap().unwrap();
  assert_eq!(stored.root_parent.hash.as_deref(), Some("0xa1"));
  assert_eq!(
    stored.root_parent.url.as_deref(),
    Some("chain://farcaster/memes")
  );
}

#[tokio::test]
async fn cast_with_embeds_counts_quotes() {
  let mut data = data_for(MessageType::CastAdd, 5, 10);
  data.cast_add_body = Some(CastAddBody {
    text:   Some("look at these".to_string()),
    embeds: vec![
      Embed { url: Some("https://a.example".into()), cast_id: None },
      Embed { url: Some("https://b.example".into()), cast_id: None },
      Embed {
        url:     None,
        cast_id: Some(CastId { fid: 8, hash: "0xcc".into() }),
      },
    ],
    ..CastAddBody::default()
  });
  let message = envelope(data, "0xa1");

  let (processor, store, _publisher) = fixture(FakeHub::default()).await;
  processor.process(&message).await.unwrap();

  let stored = store.get_cast("0xa1").await.unwrap().unwrap();
  assert_eq!(stored.embeds.len(), 3);
  assert!(matches!(&stored.embeds[2], CastEmbed::Cast { hash, .. } if hash == "0xcc"));

  assert_eq!(store.cast_stats("0xcc").await.unwrap().quotes, 1);
}

#[tokio::test]
async fn cast_remove_reverts_stats_from_the_stored_record() {
  let hub = FakeHub::default();
  hub.add_cast(cast_add(99, "0xa1", "the root"));
  let (processor, store, publisher) = fixture(hub).await;

  // A reply that also quotes another cast.
  let mut data = data_for(MessageType::CastAdd, 7, 20);
  data.cast_add_body = Some(CastAddBody {
    text: Some("reply with a quote".to_string()),
    parent_cast_id: Some(CastId { fid: 99, hash: "0xa1".into() }),
    embeds: vec![Embed {
      url:     None,
      cast_id: Some(CastId { fid: 8, hash: "0xcc".into() }),
    }],
    ..CastAddBody::default()
  });
  processor.process(&envelope(data, "0xb1")).await.unwrap();

  assert_eq!(store.cast_stats("0xa1").await.unwrap().replies, 1);
  assert_eq!(store.cast_stats("0xcc").await.unwrap().quotes, 1);

  // The remove message carries only the target hash; decrements must come
  // from the stored record, including the quote from its embed rows.
  processor.process(&cast_remove(7, "0xb1", 30)).await.unwrap();

  assert_eq!(store.cast_stats("0xa1").await.unwrap().replies, 0);
  assert_eq!(store.cast_stats("0xcc").await.unwrap().quotes, 0);
  assert_eq!(store.user_stats(Fid(7)).await.unwrap().replies, 0);
  assert_eq!(store.user_stats(Fid(99)).await.unwrap().replies_received, 0);

  assert_eq!(publisher.kinds(), vec!["cast_added", "cast_removed"]);
  let events = publisher.events();
  let DomainEvent::CastRemoved(removed) = &events[1].0 else {
    panic!("expected a cast_removed event");
  };
  assert!(!removed.is_active());
  assert_eq!(removed.embeds.len(), 1);

  // Soft-deleted, never hard-deleted.
  let stored = store.get_cast("0xb1").await.unwrap().unwrap();
  assert!(!stored.is_active());
}

#[tokio::test]
async fn remove_before_add_is_tolerated() {
  let (processor, store, publisher) = fixture(FakeHub::default()).await;

  assert_eq!(
    processor.process(&cast_remove(5, "0xa1", 10)).await.unwrap(),
    ProcessOutcome::Duplicate
  );
  assert_eq!(store.user_stats(Fid(5)).await.unwrap().casts, 0);

  assert_eq!(
    processor.process(&cast_add(5, "0xa1", "late add")).await.unwrap(),
    ProcessOutcome::Applied
  );
  assert_eq!(store.user_stats(Fid(5)).await.unwrap().casts, 1);
  assert_eq!(publisher.kinds(), vec!["cast_added"]);
}

// ─── Root resolution ─────────────────────────────────────────────────────────

#[tokio::test]
async fn root_resolution_walks_to_the_thread_root() {
  let hub = FakeHub::default();
  hub.add_cast(channel_cast(1, "0xc1", "chain://ch"));
  hub.add_cast(reply_add(2, "0xc2", 1, "0xc1"));
  hub.add_cast(reply_add(3, "0xc3", 2, "0xc2"));
  let (processor, store, _publisher) = fixture(hub).await;

  processor.process(&reply_add(4, "0xc4", 3, "0xc3")).await.unwrap();

  let stored = store.get_cast("0xc4").await.unwrap().unwrap();
  assert_eq!(
    stored.root_parent,
    RootParent {
      fid:  Some(Fid(1)),
      hash: Some("0xc1".to_string()),
      url:  Some("chain://ch".to_string()),
    }
  );
}

#[tokio::test]
async fn unresolvable_parent_is_not_fatal() {
  let (processor, store, publisher) = fixture(FakeHub::default()).await;

  let outcome = processor
    .process(&reply_add(7, "0xb1", 99, "0xeeee"))
    .await
    .unwrap();
  assert_eq!(outcome, ProcessOutcome::Applied);

  // The reply is stored and counted; only the root fields stay empty.
  let stored = store.get_cast("0xb1").await.unwrap().unwrap();
  assert_eq!(stored.root_parent, RootParent::default());
  assert_eq!(store.user_stats(Fid(7)).await.unwrap().replies, 1);
  assert_eq!(publisher.kinds(), vec!["cast_added"]);
}

#[tokio::test]
async fn cyclic_thread_hits_the_hop_bound() {
  let hub = FakeHub::default();
  hub.add_cast(reply_add(1, "0xa1", 2, "0xb1"));
  hub.add_cast(reply_add(2, "0xb1", 1, "0xa1"));
  let (processor, store, publisher) = fixture_with_config(
    hub,
    ResolverConfig { max_hops: 10, ..ResolverConfig::default() },
  )
  .await;

  let err = processor
    .process(&reply_add(3, "0xd1", 1, "0xa1"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ThreadDepthExceeded(10)));

  // Failed loudly before any state mutation.
  assert!(store.get_cast("0xd1").await.unwrap().is_none());
  assert!(publisher.events().is_empty());
}

// ─── Reactions ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn like_add_then_remove_nets_to_zero() {
  let (processor, store, publisher) = fixture(FakeHub::default()).await;

  processor
    .process(&reaction_message(
      MessageType::ReactionAdd,
      ReactionType::Like,
      7,
      2,
      "0xa1",
      10,
    ))
    .await
    .unwrap();

  assert_eq!(store.cast_stats("0xa1").await.unwrap().likes, 1);
  assert_eq!(store.user_stats(Fid(7)).await.unwrap().likes, 1);
  assert_eq!(store.user_stats(Fid(2)).await.unwrap().likes_received, 1);

  processor
    .process(&reaction_message(
      MessageType::ReactionRemove,
      ReactionType::Like,
      7,
      2,
      "0xa1",
      20,
    ))
    .await
    .unwrap();

  assert_eq!(store.cast_stats("0xa1").await.unwrap().likes, 0);
  assert_eq!(store.user_stats(Fid(7)).await.unwrap().likes, 0);
  assert_eq!(store.user_stats(Fid(2)).await.unwrap().likes_received, 0);
  assert_eq!(publisher.kinds(), vec!["reaction_added", "reaction_removed"]);
}

#[tokio::test]
async fn reaction_remove_sources_target_author_from_the_store() {
  let (processor, store, publisher) = fixture(FakeHub::default()).await;

  processor
    .process(&reaction_message(
      MessageType::ReactionAdd,
      ReactionType::Recast,
      7,
      2,
      "0xa1",
      10,
    ))
    .await
    .unwrap();

  // The remove claims a bogus target author; the stored row wins.
  processor
    .process(&reaction_message(
      MessageType::ReactionRemove,
      ReactionType::Recast,
      7,
      0,
      "0xa1",
      20,
    ))
    .await
    .unwrap();

  assert_eq!(store.user_stats(Fid(2)).await.unwrap().recasts_received, 0);
  assert_eq!(store.user_stats(Fid(0)).await.unwrap().recasts_received, 0);

  let events = publisher.events();
  let DomainEvent::ReactionRemoved(removed) = &events[1].0 else {
    panic!("expected a reaction_removed event");
  };
  assert!(matches!(
    removed.target,
    ReactionTarget::Cast { fid: Fid(2), .. }
  ));
}

#[tokio::test]
async fn reaction_remove_without_add_skips_silently() {
  let (processor, store, publisher) = fixture(FakeHub::default()).await;

  let outcome = processor
    .process(&reaction_message(
      MessageType::ReactionRemove,
      ReactionType::Like,
      7,
      2,
      "0xa1",
      10,
    ))
    .await
    .unwrap();

  assert_eq!(outcome, ProcessOutcome::Duplicate);
  assert_eq!(store.cast_stats("0xa1").await.unwrap().likes, 0);
  assert!(publisher.events().is_empty());
}

// ─── Links ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn follow_add_then_remove_nets_to_zero_but_keeps_the_row() {
  let (processor, store, publisher) = fixture(FakeHub::default()).await;

  processor
    .process(&link_message(MessageType::LinkAdd, 1, 2, 10))
    .await
    .unwrap();
  assert_eq!(store.user_stats(Fid(1)).await.unwrap().following, 1);
  assert_eq!(store.user_stats(Fid(2)).await.unwrap().followers, 1);

  processor
    .process(&link_message(MessageType::LinkRemove, 1, 2, 20))
    .await
    .unwrap();
  assert_eq!(store.user_stats(Fid(1)).await.unwrap().following, 0);
  assert_eq!(store.user_stats(Fid(2)).await.unwrap().followers, 0);

  // History survives the removal.
  let stored = store.get_link(Fid(1), "follow", Fid(2)).await.unwrap().unwrap();
  assert!(!stored.is_active());
  assert_eq!(publisher.kinds(), vec!["link_added", "link_removed"]);
}

#[tokio::test]
async fn duplicate_follow_does_not_double_count() {
  let (processor, store, _publisher) = fixture(FakeHub::default()).await;

  let message = link_message(MessageType::LinkAdd, 1, 2, 10);
  processor.process(&message).await.unwrap();
  assert_eq!(
    processor.process(&message).await.unwrap(),
    ProcessOutcome::Duplicate
  );
  assert_eq!(store.user_stats(Fid(2)).await.unwrap().followers, 1);
}

// ─── Verifications / user data / proofs ──────────────────────────────────────

#[tokio::test]
async fn verification_lifecycle_publishes_stored_fields() {
  let (processor, store, publisher) = fixture(FakeHub::default()).await;

  let mut data = data_for(MessageType::VerificationAdd, 4, 10);
  data.verification_add_address_body = Some(VerificationAddBody {
    address:  Some("0xDEADBEEF".into()),
    protocol: None,
  });
  processor.process(&envelope(data, "0x00")).await.unwrap();

  let mut data = data_for(MessageType::VerificationRemove, 4, 20);
  data.verification_remove_body = Some(VerificationRemoveBody {
    address:  Some("0xdeadbeef".into()),
    protocol: None,
  });
  processor.process(&envelope(data, "0x00")).await.unwrap();

  assert_eq!(
    publisher.kinds(),
    vec!["verification_added", "verification_removed"]
  );
  let stored = store.get_verification(Fid(4), "0xdeadbeef").await.unwrap();
  assert!(!stored.unwrap().is_active());
}

#[tokio::test]
async fn user_data_update_is_idempotent_per_delivery() {
  let (processor, _store, publisher) = fixture(FakeHub::default()).await;

  let message =
    user_data_message(3, UserDataType::Display, "Alice", 10);
  assert_eq!(
    processor.process(&message).await.unwrap(),
    ProcessOutcome::Applied
  );
  assert_eq!(
    processor.process(&message).await.unwrap(),
    ProcessOutcome::Duplicate
  );

  // A later value supersedes and publishes again.
  let newer = user_data_message(3, UserDataType::Display, "Alice L.", 20);
  assert_eq!(
    processor.process(&newer).await.unwrap(),
    ProcessOutcome::Applied
  );
  assert_eq!(
    publisher.kinds(),
    vec!["user_data_updated", "user_data_updated"]
  );
}

#[tokio::test]
async fn username_proof_upserts_last_write_wins() {
  let (processor, store, publisher) = fixture(FakeHub::default()).await;

  let mut data = data_for(MessageType::UsernameProof, 3, 10);
  data.username_proof_body = Some(UserNameProofBody {
    name:      Some("alice".into()),
    owner:     Some("0xFEED".into()),
    fid:       Some(3),
    timestamp: Some(1_700_000_000),
    proof_type: None,
  });
  processor.process(&envelope(data.clone(), "0x00")).await.unwrap();

  // Exact redelivery: no second event.
  assert_eq!(
    processor.process(&envelope(data, "0x00")).await.unwrap(),
    ProcessOutcome::Duplicate
  );

  let stored = store.get_username_proof("alice").await.unwrap().unwrap();
  assert_eq!(stored.fid, Fid(3));
  assert_eq!(stored.owner, "0xfeed");
  assert_eq!(publisher.kinds(), vec!["username_proof_updated"]);
}

// ─── Malformed input ─────────────────────────────────────────────────────────

#[tokio::test]
async fn malformed_messages_are_discarded_not_errors() {
  let (processor, store, publisher) = fixture(FakeHub::default()).await;

  // No data at all.
  let empty = Message {
    data:        None,
    hash:        Some("0xaa".into()),
    hash_scheme: None,
    signature:   None,
    signer:      None,
  };
  assert_eq!(
    processor.process(&empty).await.unwrap(),
    ProcessOutcome::Discarded
  );

  // Kind says cast-add but the body is missing.
  let bodyless = envelope(data_for(MessageType::CastAdd, 5, 10), "0xaa");
  assert_eq!(
    processor.process(&bodyless).await.unwrap(),
    ProcessOutcome::Discarded
  );

  assert!(store.get_cast("0xaa").await.unwrap().is_none());
  assert!(publisher.events().is_empty());
}

// ─── Backfill ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn backfill_pages_skips_duplicates_and_touches_no_stats() {
  let hub = FakeHub::default();
  hub.add_cast(cast_add(1, "0xa1", "root"));
  hub.set_cast_pages(vec![
    vec![cast_add(1, "0xa1", "root"), reply_add(1, "0xb1", 1, "0xa1")],
    // The second page redelivers 0xa1; skip-duplicates absorbs it.
    vec![cast_add(1, "0xc1", "more"), cast_add(1, "0xa1", "root")],
  ]);
  hub.set_reaction_pages(vec![vec![reaction_message(
    MessageType::ReactionAdd,
    ReactionType::Like,
    1,
    2,
    "0xdd",
    10,
  )]]);
  hub.set_link_pages(vec![vec![link_message(MessageType::LinkAdd, 1, 2, 10)]]);
  hub.set_user_data_pages(vec![vec![user_data_message(
    1,
    UserDataType::Pfp,
    "https://img.example/pfp.png",
    10,
  )]]);

  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  let backfill = BackfillProcessor::new(
    store.clone(),
    hub,
    ResolverConfig::default(),
  );

  let summary = backfill.backfill_fid(Fid(1)).await.unwrap();
  assert_eq!(summary.casts.fetched, 4);
  assert_eq!(summary.casts.stored, 3);
  assert_eq!(summary.reactions.stored, 1);
  assert_eq!(summary.links.stored, 1);
  assert_eq!(summary.user_data.stored, 1);
  assert_eq!(summary.verifications.stored, 0);

  // Bulk hydration maintains no counters; a recompute pass owns that.
  assert_eq!(store.user_stats(Fid(1)).await.unwrap().casts, 0);
  assert_eq!(store.cast_stats("0xa1").await.unwrap().replies, 0);
  assert_eq!(store.cast_stats("0xdd").await.unwrap().likes, 0);

  // Roots were still resolved inline for replies.
  let reply = store.get_cast("0xb1").await.unwrap().unwrap();
  assert_eq!(reply.root_parent.hash.as_deref(), Some("0xa1"));
  assert_eq!(reply.root_parent.fid, Some(Fid(1)));
}

#[tokio::test]
async fn backfill_of_an_empty_account_is_empty() {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  let backfill = BackfillProcessor::new(
    store,
    FakeHub::default(),
    ResolverConfig::default(),
  );

  let summary = backfill.backfill_fid(Fid(42)).await.unwrap();
  assert_eq!(summary, crate::backfill::BackfillSummary::default());
}
