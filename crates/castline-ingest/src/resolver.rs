//! Root-parent resolution for reply threads.
//!
//! A reply's `root_parent` is the top-most ancestor of its thread. The
//! walk follows parent pointers via Hub RPC — each hop depends on the
//! previous result, so the chain is sequential — under an explicit hop
//! bound and per-hop timeout. A missing ancestor is expected (Hubs prune
//! and lag) and leaves the root unresolved; an exceeded bound means a
//! cyclic or corrupted thread and fails loudly.

use std::time::Duration;

use castline_core::record::{Cast, RootParent};
use castline_proto::{decode::decode_cast_add, hub::HubClient};
use tracing::debug;

use crate::error::{Error, Result};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Bounds for the ancestry walk.
#[derive(Debug, Clone, Copy)]
pub struct ResolverConfig {
  /// Defensive upper bound on thread depth. The protocol enforces no
  /// maximum; exceeding this indicates a cycle, not a deep thread.
  pub max_hops:    usize,
  /// Timeout applied to each individual Hub fetch.
  pub hop_timeout: Duration,
}

impl Default for ResolverConfig {
  fn default() -> Self {
    Self { max_hops: 1000, hop_timeout: Duration::from_secs(5) }
  }
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Walks a reply's parent chain to the thread root.
pub struct RootParentResolver<H> {
  hub:    H,
  config: ResolverConfig,
}

impl<H: HubClient> RootParentResolver<H> {
  pub fn new(hub: H, config: ResolverConfig) -> Self { Self { hub, config } }

  /// Resolve the thread root for `cast`.
  ///
  /// A cast with no parent is its own root. Otherwise the parent chain is
  /// fetched hop by hop until a parentless cast is found; that cast's
  /// fid/hash/channel-URL become the root. If any ancestor cannot be
  /// fetched (or decodes to nothing), the root is left unresolved —
  /// callers must tolerate a reply without root fields.
  pub async fn resolve(&self, cast: &Cast) -> Result<RootParent> {
    let Some(parent) = &cast.parent else {
      return Ok(RootParent {
        fid:  Some(cast.fid),
        hash: Some(cast.hash.clone()),
        url:  cast.parent_url.clone(),
      });
    };

    let mut fid = parent.fid;
    let mut hash = parent.hash.clone();

    for _ in 0..self.config.max_hops {
      let fetched =
        tokio::time::timeout(self.config.hop_timeout, self.hub.cast_by_id(fid, &hash))
          .await
          .map_err(|_| Error::HubTimeout(self.config.hop_timeout))?
          .map_err(Error::hub)?;

      let Some(message) = fetched else {
        debug!(%fid, hash, "ancestor not found on hub; root left unresolved");
        return Ok(RootParent::default());
      };
      let Some(ancestor) = decode_cast_add(&message) else {
        debug!(%fid, hash, "ancestor is not a decodable cast; root left unresolved");
        return Ok(RootParent::default());
      };

      match ancestor.parent {
        Some(next) => {
          fid = next.fid;
          hash = next.hash;
        }
        None => {
          return Ok(RootParent {
            fid:  Some(ancestor.fid),
            hash: Some(ancestor.hash),
            url:  ancestor.parent_url,
          });
        }
      }
    }

    Err(Error::ThreadDepthExceeded(self.config.max_hops))
  }
}
