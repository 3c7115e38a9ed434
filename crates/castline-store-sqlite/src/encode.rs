//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 UTC at fixed microsecond width, so
//! lexicographic order on the column matches time order — the
//! last-write-wins comparisons rely on this. Fids are stored as signed
//! integers (they fit comfortably), reaction kinds as their protocol wire
//! numbers, discriminant-like enums as lowercase strings.

use castline_core::{
  id::Fid,
  record::{
    Cast, CastEmbed, CastMention, CastParent, Link, Reaction, ReactionKind,
    ReactionTarget, RootParent, UserData, UserDataKind, UsernameProof,
    Verification, VerificationProtocol,
  },
};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_dt_opt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

// ─── Fid ─────────────────────────────────────────────────────────────────────

pub fn encode_fid(fid: Fid) -> i64 { fid.0 as i64 }

pub fn decode_fid(v: i64) -> Fid { Fid(v as u64) }

// ─── ReactionKind ────────────────────────────────────────────────────────────

pub fn encode_reaction_kind(kind: ReactionKind) -> i64 {
  match kind {
    ReactionKind::Like => 1,
    ReactionKind::Recast => 2,
  }
}

pub fn decode_reaction_kind(v: i64) -> Result<ReactionKind> {
  match v {
    1 => Ok(ReactionKind::Like),
    2 => Ok(ReactionKind::Recast),
    other => Err(Error::UnknownDiscriminant(other.to_string())),
  }
}

// ─── VerificationProtocol ────────────────────────────────────────────────────

pub fn encode_protocol(p: VerificationProtocol) -> &'static str {
  match p {
    VerificationProtocol::Ethereum => "ethereum",
    VerificationProtocol::Solana => "solana",
  }
}

pub fn decode_protocol(s: &str) -> Result<VerificationProtocol> {
  match s {
    "ethereum" => Ok(VerificationProtocol::Ethereum),
    "solana" => Ok(VerificationProtocol::Solana),
    other => Err(Error::UnknownDiscriminant(other.to_string())),
  }
}

// ─── UserDataKind ────────────────────────────────────────────────────────────

pub fn encode_user_data_kind(k: UserDataKind) -> &'static str {
  match k {
    UserDataKind::Pfp => "pfp",
    UserDataKind::Display => "display",
    UserDataKind::Bio => "bio",
    UserDataKind::Url => "url",
    UserDataKind::Username => "username",
    UserDataKind::Location => "location",
  }
}

pub fn decode_user_data_kind(s: &str) -> Result<UserDataKind> {
  match s {
    "pfp" => Ok(UserDataKind::Pfp),
    "display" => Ok(UserDataKind::Display),
    "bio" => Ok(UserDataKind::Bio),
    "url" => Ok(UserDataKind::Url),
    "username" => Ok(UserDataKind::Username),
    "location" => Ok(UserDataKind::Location),
    other => Err(Error::UnknownDiscriminant(other.to_string())),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `casts` row.
pub struct RawCast {
  pub hash:             String,
  pub fid:              i64,
  pub text:             String,
  pub parent_hash:      Option<String>,
  pub parent_fid:       Option<i64>,
  pub parent_url:       Option<String>,
  pub root_parent_hash: Option<String>,
  pub root_parent_fid:  Option<i64>,
  pub root_parent_url:  Option<String>,
  pub timestamp:        String,
  pub deleted_at:       Option<String>,
}

impl RawCast {
  pub fn into_cast(
    self,
    embeds: Vec<CastEmbed>,
    mentions: Vec<CastMention>,
  ) -> Result<Cast> {
    let parent = match (self.parent_hash, self.parent_fid) {
      (Some(hash), Some(fid)) => {
        Some(CastParent { fid: decode_fid(fid), hash })
      }
      (None, None) => None,
      _ => {
        return Err(Error::MalformedRow(format!(
          "cast {} has a partial parent key",
          self.hash
        )));
      }
    };

    Ok(Cast {
      hash: self.hash,
      fid: decode_fid(self.fid),
      text: self.text,
      parent,
      parent_url: self.parent_url,
      root_parent: RootParent {
        fid:  self.root_parent_fid.map(decode_fid),
        hash: self.root_parent_hash,
        url:  self.root_parent_url,
      },
      embeds,
      mentions,
      timestamp: decode_dt(&self.timestamp)?,
      deleted_at: decode_dt_opt(self.deleted_at.as_deref())?,
    })
  }
}

/// Raw values read from a `cast_reactions` or `url_reactions` row.
pub struct RawReaction {
  pub kind:        i64,
  pub fid:         i64,
  pub target_hash: Option<String>,
  pub target_fid:  Option<i64>,
  pub target_url:  Option<String>,
  pub timestamp:   String,
  pub deleted_at:  Option<String>,
}

impl RawReaction {
  pub fn into_reaction(self) -> Result<Reaction> {
    let target = match (self.target_hash, self.target_fid, self.target_url) {
      (Some(hash), Some(fid), None) => {
        ReactionTarget::Cast { fid: decode_fid(fid), hash }
      }
      (None, None, Some(url)) => ReactionTarget::Url { url },
      _ => {
        return Err(Error::MalformedRow(
          "reaction row with no coherent target".to_string(),
        ));
      }
    };

    Ok(Reaction {
      kind: decode_reaction_kind(self.kind)?,
      fid: decode_fid(self.fid),
      target,
      timestamp: decode_dt(&self.timestamp)?,
      deleted_at: decode_dt_opt(self.deleted_at.as_deref())?,
    })
  }
}

/// Raw values read from a `links` row.
pub struct RawLink {
  pub fid:        i64,
  pub link_type:  String,
  pub target_fid: i64,
  pub timestamp:  String,
  pub deleted_at: Option<String>,
}

impl RawLink {
  pub fn into_link(self) -> Result<Link> {
    Ok(Link {
      fid:        decode_fid(self.fid),
      link_type:  self.link_type,
      target_fid: decode_fid(self.target_fid),
      timestamp:  decode_dt(&self.timestamp)?,
      deleted_at: decode_dt_opt(self.deleted_at.as_deref())?,
    })
  }
}

/// Raw values read from a `verifications` row.
pub struct RawVerification {
  pub fid:        i64,
  pub address:    String,
  pub protocol:   String,
  pub timestamp:  String,
  pub deleted_at: Option<String>,
}

impl RawVerification {
  pub fn into_verification(self) -> Result<Verification> {
    Ok(Verification {
      fid:        decode_fid(self.fid),
      address:    self.address,
      protocol:   decode_protocol(&self.protocol)?,
      timestamp:  decode_dt(&self.timestamp)?,
      deleted_at: decode_dt_opt(self.deleted_at.as_deref())?,
    })
  }
}

/// Raw values read from a `user_data` row.
pub struct RawUserData {
  pub fid:       i64,
  pub kind:      String,
  pub value:     String,
  pub timestamp: String,
}

impl RawUserData {
  pub fn into_user_data(self) -> Result<UserData> {
    Ok(UserData {
      fid:       decode_fid(self.fid),
      kind:      decode_user_data_kind(&self.kind)?,
      value:     self.value,
      timestamp: decode_dt(&self.timestamp)?,
    })
  }
}

/// Raw values read from a `username_proofs` row.
pub struct RawUsernameProof {
  pub username:  String,
  pub fid:       i64,
  pub owner:     String,
  pub timestamp: String,
}

impl RawUsernameProof {
  pub fn into_proof(self) -> Result<UsernameProof> {
    Ok(UsernameProof {
      username:  self.username,
      fid:       decode_fid(self.fid),
      owner:     self.owner,
      timestamp: decode_dt(&self.timestamp)?,
    })
  }
}
