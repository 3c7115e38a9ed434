//! The event processor — the state machine at the center of ingestion.
//!
//! Every entity instance transitions `absent → active → soft-deleted`
//! (user-data and username proofs have no soft-delete state and are
//! last-write-wins). The add contract: decode, upsert under the natural
//! unique key, apply stat increments, publish. The remove contract: look
//! up by key, soft-delete, apply the inverse decrements from the *stored*
//! record, publish the pre-deletion fields. Duplicate adds and removes
//! are no-ops with no event — redelivering any message, or retrying a
//! sequence that failed partway, converges to the same state.

use castline_core::{
  event::DomainEvent,
  publish::EventPublisher,
  record::{
    Cast, CastEmbed, CastRemove, DecodedMessage, Link, LinkRemove, Reaction,
    ReactionRemove, ReactionTarget, UserData, UsernameProof, Verification,
    VerificationRemove,
  },
  stats::{CastStatField, ParentUrlStatField, StatDelta, UserStatField},
  store::IngestStore,
};
use castline_proto::{decode, hub::HubClient, wire::Message};
use tracing::debug;

use crate::{
  error::{Error, Result},
  resolver::{ResolverConfig, RootParentResolver},
};

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// What processing one message did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
  /// State changed and a domain event was published.
  Applied,
  /// The message was already covered by stored state (redelivery, or a
  /// remove for something never seen). No mutation, no event.
  Duplicate,
  /// The message was malformed or of an unknown kind. Not an error.
  Discarded,
}

// ─── Processor ───────────────────────────────────────────────────────────────

/// Processes one Hub message to completion: decode → resolve root if
/// needed → store writes → stat writes → publish.
pub struct EventProcessor<S, H, P> {
  store:     S,
  resolver:  RootParentResolver<H>,
  publisher: P,
}

impl<S, H, P> EventProcessor<S, H, P>
where
  S: IngestStore,
  H: HubClient,
  P: EventPublisher,
{
  pub fn new(
    store: S,
    hub: H,
    publisher: P,
    resolver_config: ResolverConfig,
  ) -> Self {
    Self {
      store,
      resolver: RootParentResolver::new(hub, resolver_config),
      publisher,
    }
  }

  /// Process one raw Hub message.
  pub async fn process(&self, message: &Message) -> Result<ProcessOutcome> {
    match decode(message) {
      Some(decoded) => self.process_decoded(decoded).await,
      None => {
        debug!("malformed or unknown message discarded");
        Ok(ProcessOutcome::Discarded)
      }
    }
  }

  /// Process an already-decoded message.
  pub async fn process_decoded(
    &self,
    decoded: DecodedMessage,
  ) -> Result<ProcessOutcome> {
    match decoded {
      DecodedMessage::CastAdd(cast) => self.apply_cast_add(cast).await,
      DecodedMessage::CastRemove(remove) => self.apply_cast_remove(remove).await,
      DecodedMessage::ReactionAdd(reaction) => {
        self.apply_reaction_add(reaction).await
      }
      DecodedMessage::ReactionRemove(remove) => {
        self.apply_reaction_remove(remove).await
      }
      DecodedMessage::LinkAdd(link) => self.apply_link_add(link).await,
      DecodedMessage::LinkRemove(remove) => self.apply_link_remove(remove).await,
      DecodedMessage::VerificationAdd(verification) => {
        self.apply_verification_add(verification).await
      }
      DecodedMessage::VerificationRemove(remove) => {
        self.apply_verification_remove(remove).await
      }
      DecodedMessage::UserDataAdd(data) => self.apply_user_data(data).await,
      DecodedMessage::UsernameProof(proof) => {
        self.apply_username_proof(proof).await
      }
    }
  }

  // ── Casts ─────────────────────────────────────────────────────────────

  async fn apply_cast_add(&self, mut cast: Cast) -> Result<ProcessOutcome> {
    // Resolved before the write so the stored record is complete from the
    // start; the upsert keeps an existing root on resurrect.
    cast.root_parent = self.resolver.resolve(&cast).await?;

    if !self
      .store
      .upsert_cast(&cast)
      .await
      .map_err(Error::store)?
      .applied()
    {
      return Ok(ProcessOutcome::Duplicate);
    }

    self.apply_deltas(cast_stat_deltas(&cast, 1)).await?;
    self.publish(DomainEvent::CastAdded(cast)).await;
    Ok(ProcessOutcome::Applied)
  }

  async fn apply_cast_remove(&self, remove: CastRemove) -> Result<ProcessOutcome> {
    let Some(cast) = self
      .store
      .soft_delete_cast(&remove.target_hash, remove.timestamp)
      .await
      .map_err(Error::store)?
    else {
      debug!(
        target_hash = %remove.target_hash,
        "cast remove for an absent or already-deleted record"
      );
      return Ok(ProcessOutcome::Duplicate);
    };

    // Decrements mirror the add exactly, sourced from the stored record —
    // including the quotes decrement, which reads the cast's own embed
    // rows rather than anything on the remove message.
    self.apply_deltas(cast_stat_deltas(&cast, -1)).await?;
    self.publish(DomainEvent::CastRemoved(cast)).await;
    Ok(ProcessOutcome::Applied)
  }

  // ── Reactions ─────────────────────────────────────────────────────────

  async fn apply_reaction_add(
    &self,
    reaction: Reaction,
  ) -> Result<ProcessOutcome> {
    if !self
      .store
      .upsert_reaction(&reaction)
      .await
      .map_err(Error::store)?
      .applied()
    {
      return Ok(ProcessOutcome::Duplicate);
    }

    self.apply_deltas(reaction_stat_deltas(&reaction, 1)).await?;
    self.publish(DomainEvent::ReactionAdded(reaction)).await;
    Ok(ProcessOutcome::Applied)
  }

  async fn apply_reaction_remove(
    &self,
    remove: ReactionRemove,
  ) -> Result<ProcessOutcome> {
    let Some(stored) = self
      .store
      .soft_delete_reaction(remove.kind, remove.fid, &remove.target, remove.timestamp)
      .await
      .map_err(Error::store)?
    else {
      debug!("reaction remove for an absent or already-deleted record");
      return Ok(ProcessOutcome::Duplicate);
    };

    // The stored record supplies the target author for the decrement; the
    // remove message only carries the key.
    self.apply_deltas(reaction_stat_deltas(&stored, -1)).await?;
    self.publish(DomainEvent::ReactionRemoved(stored)).await;
    Ok(ProcessOutcome::Applied)
  }

  // ── Links ─────────────────────────────────────────────────────────────

  async fn apply_link_add(&self, link: Link) -> Result<ProcessOutcome> {
    if !self
      .store
      .upsert_link(&link)
      .await
      .map_err(Error::store)?
      .applied()
    {
      return Ok(ProcessOutcome::Duplicate);
    }

    self.apply_deltas(link_stat_deltas(&link, 1)).await?;
    self.publish(DomainEvent::LinkAdded(link)).await;
    Ok(ProcessOutcome::Applied)
  }

  async fn apply_link_remove(&self, remove: LinkRemove) -> Result<ProcessOutcome> {
    let Some(stored) = self
      .store
      .soft_delete_link(remove.fid, &remove.link_type, remove.target_fid, remove.timestamp)
      .await
      .map_err(Error::store)?
    else {
      debug!("link remove for an absent or already-deleted record");
      return Ok(ProcessOutcome::Duplicate);
    };

    self.apply_deltas(link_stat_deltas(&stored, -1)).await?;
    self.publish(DomainEvent::LinkRemoved(stored)).await;
    Ok(ProcessOutcome::Applied)
  }

  // ── Verifications ─────────────────────────────────────────────────────

  async fn apply_verification_add(
    &self,
    verification: Verification,
  ) -> Result<ProcessOutcome> {
    if !self
      .store
      .upsert_verification(&verification)
      .await
      .map_err(Error::store)?
      .applied()
    {
      return Ok(ProcessOutcome::Duplicate);
    }

    self.publish(DomainEvent::VerificationAdded(verification)).await;
    Ok(ProcessOutcome::Applied)
  }

  async fn apply_verification_remove(
    &self,
    remove: VerificationRemove,
  ) -> Result<ProcessOutcome> {
    let Some(stored) = self
      .store
      .soft_delete_verification(remove.fid, &remove.address, remove.timestamp)
      .await
      .map_err(Error::store)?
    else {
      debug!("verification remove for an absent or already-deleted record");
      return Ok(ProcessOutcome::Duplicate);
    };

    self.publish(DomainEvent::VerificationRemoved(stored)).await;
    Ok(ProcessOutcome::Applied)
  }

  // ── User data / username proofs ───────────────────────────────────────

  async fn apply_user_data(&self, data: UserData) -> Result<ProcessOutcome> {
    if !self
      .store
      .upsert_user_data(&data)
      .await
      .map_err(Error::store)?
      .applied()
    {
      return Ok(ProcessOutcome::Duplicate);
    }

    self.publish(DomainEvent::UserDataUpdated(data)).await;
    Ok(ProcessOutcome::Applied)
  }

  async fn apply_username_proof(
    &self,
    proof: UsernameProof,
  ) -> Result<ProcessOutcome> {
    if !self
      .store
      .upsert_username_proof(&proof)
      .await
      .map_err(Error::store)?
      .applied()
    {
      return Ok(ProcessOutcome::Duplicate);
    }

    self.publish(DomainEvent::UsernameProofUpdated(proof)).await;
    Ok(ProcessOutcome::Applied)
  }

  // ── Helpers ───────────────────────────────────────────────────────────

  async fn apply_deltas(&self, deltas: Vec<StatDelta>) -> Result<()> {
    if deltas.is_empty() {
      return Ok(());
    }
    self
      .store
      .apply_stat_deltas(&deltas)
      .await
      .map_err(Error::store)
  }

  async fn publish(&self, event: DomainEvent) {
    self.publisher.publish(event, false).await;
  }
}

// ─── Stat tables ─────────────────────────────────────────────────────────────

/// The stat side effects of a cast lifecycle transition. `sign` is +1 on
/// add and -1 on remove, so removal always mirrors the add it reverses.
fn cast_stat_deltas(cast: &Cast, sign: i64) -> Vec<StatDelta> {
  let mut deltas = Vec::new();

  match &cast.parent {
    Some(parent) => {
      deltas.push(StatDelta::Cast {
        hash:  parent.hash.clone(),
        field: CastStatField::Replies,
        delta: sign,
      });
      deltas.push(StatDelta::User {
        fid:   cast.fid,
        field: UserStatField::Replies,
        delta: sign,
      });
      deltas.push(StatDelta::User {
        fid:   parent.fid,
        field: UserStatField::RepliesReceived,
        delta: sign,
      });
      if let Some(url) = &cast.parent_url {
        deltas.push(StatDelta::ParentUrl {
          url:   url.clone(),
          field: ParentUrlStatField::Replies,
          delta: sign,
        });
      }
    }
    None => {
      deltas.push(StatDelta::User {
        fid:   cast.fid,
        field: UserStatField::Casts,
        delta: sign,
      });
      if let Some(url) = &cast.parent_url {
        deltas.push(StatDelta::ParentUrl {
          url:   url.clone(),
          field: ParentUrlStatField::Casts,
          delta: sign,
        });
      }
    }
  }

  // Each embedded cast is a quote of its target.
  for embed in &cast.embeds {
    if let CastEmbed::Cast { hash, .. } = embed {
      deltas.push(StatDelta::Cast {
        hash:  hash.clone(),
        field: CastStatField::Quotes,
        delta: sign,
      });
    }
  }

  deltas
}

/// The stat side effects of a reaction transition. URL targets maintain
/// no counters.
fn reaction_stat_deltas(reaction: &Reaction, sign: i64) -> Vec<StatDelta> {
  let ReactionTarget::Cast { fid: target_fid, hash } = &reaction.target else {
    return Vec::new();
  };
  let fields = reaction.kind.stat_fields();

  vec![
    StatDelta::Cast { hash: hash.clone(), field: fields.cast, delta: sign },
    StatDelta::User { fid: reaction.fid, field: fields.given, delta: sign },
    StatDelta::User { fid: *target_fid, field: fields.received, delta: sign },
  ]
}

/// The stat side effects of a link transition. Only follows maintain
/// counters.
fn link_stat_deltas(link: &Link, sign: i64) -> Vec<StatDelta> {
  if !link.is_follow() {
    return Vec::new();
  }
  vec![
    StatDelta::User {
      fid:   link.fid,
      field: UserStatField::Following,
      delta: sign,
    },
    StatDelta::User {
      fid:   link.target_fid,
      field: UserStatField::Followers,
      delta: sign,
    },
  ]
}
