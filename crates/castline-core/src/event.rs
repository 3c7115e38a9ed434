//! Normalized domain events, republished after each successful state
//! transition.
//!
//! Events are ephemeral — this core never persists them; they are owned
//! by the downstream queue. Removal events carry the pre-deletion record
//! (with `deleted_at` set) so subscribers can act on what was removed.

use serde::{Deserialize, Serialize};

use crate::record::{
  Cast, Link, Reaction, UserData, UsernameProof, Verification,
};

/// The outward-facing event envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum DomainEvent {
  CastAdded(Cast),
  CastRemoved(Cast),
  ReactionAdded(Reaction),
  ReactionRemoved(Reaction),
  LinkAdded(Link),
  LinkRemoved(Link),
  VerificationAdded(Verification),
  VerificationRemoved(Verification),
  UserDataUpdated(UserData),
  UsernameProofUpdated(UsernameProof),
}

impl DomainEvent {
  /// The discriminant string, matching the serde `type` tag above.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::CastAdded(_) => "cast_added",
      Self::CastRemoved(_) => "cast_removed",
      Self::ReactionAdded(_) => "reaction_added",
      Self::ReactionRemoved(_) => "reaction_removed",
      Self::LinkAdded(_) => "link_added",
      Self::LinkRemoved(_) => "link_removed",
      Self::VerificationAdded(_) => "verification_added",
      Self::VerificationRemoved(_) => "verification_removed",
      Self::UserDataUpdated(_) => "user_data_updated",
      Self::UsernameProofUpdated(_) => "username_proof_updated",
    }
  }
}
