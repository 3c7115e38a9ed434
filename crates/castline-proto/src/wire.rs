//! serde models of the Hub HTTP API's JSON message envelope.
//!
//! Field presence is deliberately loose: everything the decoder needs is
//! `Option` or defaulted, because a Hub is free to omit fields and a
//! malformed message must decode to "skip", never to a crash. Unknown
//! enum tags map to an `Unknown` variant for the same reason.

use serde::{Deserialize, Serialize};

// ─── Envelope ────────────────────────────────────────────────────────────────

/// One signed protocol message as returned by the Hub HTTP API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
  #[serde(default)]
  pub data:        Option<MessageData>,
  /// Content hash, hex with a `0x` prefix.
  #[serde(default)]
  pub hash:        Option<String>,
  #[serde(default)]
  pub hash_scheme: Option<String>,
  #[serde(default)]
  pub signature:   Option<String>,
  #[serde(default)]
  pub signer:      Option<String>,
}

/// The signed payload of a [`Message`]. Exactly one body field is set,
/// according to `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageData {
  #[serde(rename = "type")]
  pub kind:      MessageType,
  pub fid:       u64,
  /// Seconds since the Farcaster epoch.
  pub timestamp: u32,
  #[serde(default)]
  pub network:   Option<String>,

  #[serde(default)]
  pub cast_add_body:             Option<CastAddBody>,
  #[serde(default)]
  pub cast_remove_body:          Option<CastRemoveBody>,
  #[serde(default)]
  pub reaction_body:             Option<ReactionBody>,
  #[serde(default)]
  pub link_body:                 Option<LinkBody>,
  #[serde(default)]
  pub verification_add_address_body: Option<VerificationAddBody>,
  #[serde(default)]
  pub verification_remove_body:  Option<VerificationRemoveBody>,
  #[serde(default)]
  pub user_data_body:            Option<UserDataBody>,
  #[serde(default)]
  pub username_proof_body:       Option<UserNameProofBody>,
}

/// Protocol message kinds this pipeline consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
  #[serde(rename = "MESSAGE_TYPE_CAST_ADD")]
  CastAdd,
  #[serde(rename = "MESSAGE_TYPE_CAST_REMOVE")]
  CastRemove,
  #[serde(rename = "MESSAGE_TYPE_REACTION_ADD")]
  ReactionAdd,
  #[serde(rename = "MESSAGE_TYPE_REACTION_REMOVE")]
  ReactionRemove,
  #[serde(rename = "MESSAGE_TYPE_LINK_ADD")]
  LinkAdd,
  #[serde(rename = "MESSAGE_TYPE_LINK_REMOVE")]
  LinkRemove,
  #[serde(rename = "MESSAGE_TYPE_VERIFICATION_ADD_ETH_ADDRESS")]
  VerificationAdd,
  #[serde(rename = "MESSAGE_TYPE_VERIFICATION_REMOVE")]
  VerificationRemove,
  #[serde(rename = "MESSAGE_TYPE_USER_DATA_ADD")]
  UserDataAdd,
  #[serde(rename = "MESSAGE_TYPE_USERNAME_PROOF")]
  UsernameProof,
  #[serde(other)]
  Unknown,
}

// ─── Bodies ──────────────────────────────────────────────────────────────────

/// A reference to a cast by author and hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastId {
  pub fid:  u64,
  pub hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastAddBody {
  #[serde(default)]
  pub text:               Option<String>,
  #[serde(default)]
  pub parent_cast_id:     Option<CastId>,
  #[serde(default)]
  pub parent_url:         Option<String>,
  #[serde(default)]
  pub embeds:             Vec<Embed>,
  /// Mentioned fids, parallel to `mentions_positions`.
  #[serde(default)]
  pub mentions:           Vec<u64>,
  /// Byte offsets into the UTF-8 text, parallel to `mentions`.
  #[serde(default)]
  pub mentions_positions: Vec<u32>,
}

/// One embed slot: a URL or a quoted cast.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Embed {
  #[serde(default)]
  pub url:     Option<String>,
  #[serde(default)]
  pub cast_id: Option<CastId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastRemoveBody {
  #[serde(default)]
  pub target_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionBody {
  #[serde(rename = "type")]
  pub kind:           ReactionType,
  #[serde(default)]
  pub target_cast_id: Option<CastId>,
  #[serde(default)]
  pub target_url:     Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReactionType {
  #[serde(rename = "REACTION_TYPE_LIKE")]
  Like,
  #[serde(rename = "REACTION_TYPE_RECAST")]
  Recast,
  #[serde(other)]
  Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkBody {
  #[serde(rename = "type", default)]
  pub link_type:  Option<String>,
  #[serde(default)]
  pub target_fid: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationAddBody {
  #[serde(default)]
  pub address:  Option<String>,
  #[serde(default)]
  pub protocol: Option<ProtocolType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRemoveBody {
  #[serde(default)]
  pub address:  Option<String>,
  #[serde(default)]
  pub protocol: Option<ProtocolType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolType {
  #[serde(rename = "PROTOCOL_ETHEREUM")]
  Ethereum,
  #[serde(rename = "PROTOCOL_SOLANA")]
  Solana,
  #[serde(other)]
  Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataBody {
  #[serde(rename = "type")]
  pub kind:  UserDataType,
  #[serde(default)]
  pub value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserDataType {
  #[serde(rename = "USER_DATA_TYPE_PFP")]
  Pfp,
  #[serde(rename = "USER_DATA_TYPE_DISPLAY")]
  Display,
  #[serde(rename = "USER_DATA_TYPE_BIO")]
  Bio,
  #[serde(rename = "USER_DATA_TYPE_URL")]
  Url,
  #[serde(rename = "USER_DATA_TYPE_USERNAME")]
  Username,
  #[serde(rename = "USER_DATA_TYPE_LOCATION")]
  Location,
  #[serde(other)]
  Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNameProofBody {
  #[serde(default)]
  pub name:      Option<String>,
  #[serde(default)]
  pub owner:     Option<String>,
  #[serde(default)]
  pub fid:       Option<u64>,
  /// Unix seconds — username proofs do not use the Farcaster epoch.
  #[serde(default)]
  pub timestamp: Option<u64>,
  #[serde(rename = "type", default)]
  pub proof_type: Option<String>,
}

// ─── Paging ──────────────────────────────────────────────────────────────────

/// One page of a paged Hub response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesPage {
  #[serde(default)]
  pub messages:        Vec<Message>,
  /// Opaque cursor; absent or empty on the last page.
  #[serde(default)]
  pub next_page_token: Option<String>,
}
