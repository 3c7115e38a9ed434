//! The message decoder: wire envelope → normalized record.
//!
//! Pure, no I/O. Every function returns `Option`: `None` means "skip,
//! not an error" — malformed messages from a Hub are expected and must
//! not crash the pipeline. Byte fields are canonicalized to `0x`
//! lowercase hex here, so all downstream comparison is string equality.
//! Mention positions are protocol byte offsets into the UTF-8 text and
//! are preserved exactly as given, never recomputed.

use castline_core::{
  id::{Fid, canonical_hex},
  record::{
    Cast, CastEmbed, CastMention, CastParent, CastRemove, DecodedMessage,
    Link, LinkRemove, Reaction, ReactionKind, ReactionRemove,
    ReactionTarget, RootParent, UserData, UserDataKind, UsernameProof,
    Verification, VerificationProtocol, VerificationRemove,
  },
  time::{from_farcaster_time, from_unix_time},
};

use crate::wire::{
  Message, MessageData, ProtocolType, ReactionType, UserDataType,
};

// ─── Dispatch ────────────────────────────────────────────────────────────────

/// Decode a raw Hub message into its normalized form, keyed off the body
/// that is actually present. Unknown kinds and absent/malformed bodies
/// decode to `None`.
pub fn decode(message: &Message) -> Option<DecodedMessage> {
  use crate::wire::MessageType as T;

  let data = message.data.as_ref()?;
  match data.kind {
    T::CastAdd => decode_cast_add(message).map(DecodedMessage::CastAdd),
    T::CastRemove => {
      decode_cast_remove(message).map(DecodedMessage::CastRemove)
    }
    T::ReactionAdd => {
      decode_reaction_add(message).map(DecodedMessage::ReactionAdd)
    }
    T::ReactionRemove => {
      decode_reaction_remove(message).map(DecodedMessage::ReactionRemove)
    }
    T::LinkAdd => decode_link_add(message).map(DecodedMessage::LinkAdd),
    T::LinkRemove => {
      decode_link_remove(message).map(DecodedMessage::LinkRemove)
    }
    T::VerificationAdd => {
      decode_verification_add(message).map(DecodedMessage::VerificationAdd)
    }
    T::VerificationRemove => decode_verification_remove(message)
      .map(DecodedMessage::VerificationRemove),
    T::UserDataAdd => {
      decode_user_data(message).map(DecodedMessage::UserDataAdd)
    }
    T::UsernameProof => {
      decode_username_proof(message).map(DecodedMessage::UsernameProof)
    }
    T::Unknown => None,
  }
}

fn data_of(message: &Message) -> Option<&MessageData> {
  message.data.as_ref()
}

// ─── Casts ───────────────────────────────────────────────────────────────────

pub fn decode_cast_add(message: &Message) -> Option<Cast> {
  let data = data_of(message)?;
  let body = data.cast_add_body.as_ref()?;
  let hash = canonical_hex(message.hash.as_deref()?)?;

  let parent = match &body.parent_cast_id {
    Some(id) => Some(CastParent {
      fid:  Fid(id.fid),
      hash: canonical_hex(&id.hash)?,
    }),
    None => None,
  };

  // Parallel arrays; a length mismatch means the message is malformed.
  if body.mentions.len() != body.mentions_positions.len() {
    return None;
  }
  let mentions = body
    .mentions
    .iter()
    .zip(&body.mentions_positions)
    .map(|(&fid, &position)| CastMention { fid: Fid(fid), position })
    .collect();

  let mut embeds = Vec::with_capacity(body.embeds.len());
  for embed in &body.embeds {
    if let Some(id) = &embed.cast_id {
      if let Some(embed_hash) = canonical_hex(&id.hash) {
        embeds.push(CastEmbed::Cast { fid: Fid(id.fid), hash: embed_hash });
      }
    } else if let Some(url) = &embed.url {
      embeds.push(CastEmbed::Url { url: url.clone() });
    }
    // An empty embed slot is skipped, not fatal.
  }

  Some(Cast {
    hash,
    fid: Fid(data.fid),
    text: body.text.clone().unwrap_or_default(),
    parent,
    parent_url: body.parent_url.clone(),
    root_parent: RootParent::default(),
    embeds,
    mentions,
    timestamp: from_farcaster_time(data.timestamp),
    deleted_at: None,
  })
}

pub fn decode_cast_remove(message: &Message) -> Option<CastRemove> {
  let data = data_of(message)?;
  let body = data.cast_remove_body.as_ref()?;
  Some(CastRemove {
    fid:         Fid(data.fid),
    target_hash: canonical_hex(body.target_hash.as_deref()?)?,
    timestamp:   from_farcaster_time(data.timestamp),
  })
}

// ─── Reactions ───────────────────────────────────────────────────────────────

fn reaction_kind(kind: ReactionType) -> Option<ReactionKind> {
  match kind {
    ReactionType::Like => Some(ReactionKind::Like),
    ReactionType::Recast => Some(ReactionKind::Recast),
    ReactionType::Unknown => None,
  }
}

fn reaction_target(body: &crate::wire::ReactionBody) -> Option<ReactionTarget> {
  if let Some(id) = &body.target_cast_id {
    return Some(ReactionTarget::Cast {
      fid:  Fid(id.fid),
      hash: canonical_hex(&id.hash)?,
    });
  }
  body
    .target_url
    .as_ref()
    .map(|url| ReactionTarget::Url { url: url.clone() })
}

pub fn decode_reaction_add(message: &Message) -> Option<Reaction> {
  let data = data_of(message)?;
  let body = data.reaction_body.as_ref()?;
  Some(Reaction {
    kind:       reaction_kind(body.kind)?,
    fid:        Fid(data.fid),
    target:     reaction_target(body)?,
    timestamp:  from_farcaster_time(data.timestamp),
    deleted_at: None,
  })
}

pub fn decode_reaction_remove(message: &Message) -> Option<ReactionRemove> {
  let data = data_of(message)?;
  let body = data.reaction_body.as_ref()?;
  Some(ReactionRemove {
    kind:      reaction_kind(body.kind)?,
    fid:       Fid(data.fid),
    target:    reaction_target(body)?,
    timestamp: from_farcaster_time(data.timestamp),
  })
}

// ─── Links ───────────────────────────────────────────────────────────────────

pub fn decode_link_add(message: &Message) -> Option<Link> {
  let data = data_of(message)?;
  let body = data.link_body.as_ref()?;
  Some(Link {
    fid:        Fid(data.fid),
    link_type:  body.link_type.clone().filter(|t| !t.is_empty())?,
    target_fid: Fid(body.target_fid?),
    timestamp:  from_farcaster_time(data.timestamp),
    deleted_at: None,
  })
}

pub fn decode_link_remove(message: &Message) -> Option<LinkRemove> {
  let data = data_of(message)?;
  let body = data.link_body.as_ref()?;
  Some(LinkRemove {
    fid:        Fid(data.fid),
    link_type:  body.link_type.clone().filter(|t| !t.is_empty())?,
    target_fid: Fid(body.target_fid?),
    timestamp:  from_farcaster_time(data.timestamp),
  })
}

// ─── Verifications ───────────────────────────────────────────────────────────

/// Canonicalize a verified address per protocol: Ethereum addresses are
/// hex and must canonicalize; Solana addresses are base58 and are kept
/// verbatim.
fn verification_address(
  address: &str,
  protocol: VerificationProtocol,
) -> Option<String> {
  match protocol {
    VerificationProtocol::Ethereum => canonical_hex(address),
    VerificationProtocol::Solana => {
      (!address.is_empty()).then(|| address.to_string())
    }
  }
}

fn verification_protocol(
  protocol: Option<ProtocolType>,
) -> Option<VerificationProtocol> {
  match protocol {
    // Older messages predate the protocol field; they are Ethereum.
    None | Some(ProtocolType::Ethereum) => Some(VerificationProtocol::Ethereum),
    Some(ProtocolType::Solana) => Some(VerificationProtocol::Solana),
    Some(ProtocolType::Unknown) => None,
  }
}

pub fn decode_verification_add(message: &Message) -> Option<Verification> {
  let data = data_of(message)?;
  let body = data.verification_add_address_body.as_ref()?;
  let protocol = verification_protocol(body.protocol)?;
  Some(Verification {
    fid: Fid(data.fid),
    address: verification_address(body.address.as_deref()?, protocol)?,
    protocol,
    timestamp: from_farcaster_time(data.timestamp),
    deleted_at: None,
  })
}

pub fn decode_verification_remove(
  message: &Message,
) -> Option<VerificationRemove> {
  let data = data_of(message)?;
  let body = data.verification_remove_body.as_ref()?;
  let protocol = verification_protocol(body.protocol)?;
  Some(VerificationRemove {
    fid:       Fid(data.fid),
    address:   verification_address(body.address.as_deref()?, protocol)?,
    timestamp: from_farcaster_time(data.timestamp),
  })
}

// ─── User data ───────────────────────────────────────────────────────────────

fn user_data_kind(kind: UserDataType) -> Option<UserDataKind> {
  match kind {
    UserDataType::Pfp => Some(UserDataKind::Pfp),
    UserDataType::Display => Some(UserDataKind::Display),
    UserDataType::Bio => Some(UserDataKind::Bio),
    UserDataType::Url => Some(UserDataKind::Url),
    UserDataType::Username => Some(UserDataKind::Username),
    UserDataType::Location => Some(UserDataKind::Location),
    UserDataType::Unknown => None,
  }
}

pub fn decode_user_data(message: &Message) -> Option<UserData> {
  let data = data_of(message)?;
  let body = data.user_data_body.as_ref()?;
  Some(UserData {
    fid:       Fid(data.fid),
    kind:      user_data_kind(body.kind)?,
    // Empty values are valid — they clear the profile field.
    value:     body.value.clone()?,
    timestamp: from_farcaster_time(data.timestamp),
  })
}

// ─── Username proofs ─────────────────────────────────────────────────────────

pub fn decode_username_proof(message: &Message) -> Option<UsernameProof> {
  let data = data_of(message)?;
  let body = data.username_proof_body.as_ref()?;
  let username = body.name.clone().filter(|n| !n.is_empty())?;
  let owner_raw = body.owner.as_deref()?;
  let owner =
    canonical_hex(owner_raw).unwrap_or_else(|| owner_raw.to_string());
  Some(UsernameProof {
    username,
    fid: Fid(body.fid.unwrap_or(data.fid)),
    owner,
    timestamp: body
      .timestamp
      .map(from_unix_time)
      .unwrap_or_else(|| from_farcaster_time(data.timestamp)),
  })
}

// ─── Tests ───────────────────────────────────────────────────────────────────
