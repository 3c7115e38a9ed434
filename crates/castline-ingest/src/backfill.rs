//! Bulk historical hydration of one account's full message history.
//!
//! Backfill operates at far higher volume than live ingestion, so it
//! deliberately skips what the live path does per message: no duplicate
//! detection against prior state (bulk insert with skip-duplicates), no
//! counter maintenance (stats are rebuilt by a separate recompute pass),
//! and no event publication. Root-parent resolution still happens, once
//! per cast, fanned out across each page.

use castline_core::{id::Fid, store::IngestStore};
use castline_proto::{
  decode::{
    decode_cast_add, decode_link_add, decode_reaction_add, decode_user_data,
    decode_username_proof, decode_verification_add,
  },
  hub::HubClient,
};
use futures::future::join_all;
use tracing::{debug, info};

use crate::{
  error::{Error, Result},
  resolver::{ResolverConfig, RootParentResolver},
};

// ─── Summary ─────────────────────────────────────────────────────────────────

/// Per-type tallies for one backfill run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillCounts {
  /// Messages returned by the Hub (including ones that failed to decode
  /// or already existed).
  pub fetched: u64,
  /// Rows actually written.
  pub stored:  u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillSummary {
  pub casts:           BackfillCounts,
  pub reactions:       BackfillCounts,
  pub links:           BackfillCounts,
  pub verifications:   BackfillCounts,
  pub user_data:       BackfillCounts,
  pub username_proofs: BackfillCounts,
}

// ─── Processor ───────────────────────────────────────────────────────────────

/// Pages through the Hub's full per-fid message sets and bulk-loads them.
pub struct BackfillProcessor<S, H> {
  store:    S,
  hub:      H,
  resolver: RootParentResolver<H>,
}

impl<S, H> BackfillProcessor<S, H>
where
  S: IngestStore,
  H: HubClient + Clone,
{
  pub fn new(store: S, hub: H, resolver_config: ResolverConfig) -> Self {
    let resolver = RootParentResolver::new(hub.clone(), resolver_config);
    Self { store, hub, resolver }
  }

  /// Hydrate the full history of one account.
  pub async fn backfill_fid(&self, fid: Fid) -> Result<BackfillSummary> {
    let mut summary = BackfillSummary::default();

    self.backfill_casts(fid, &mut summary.casts).await?;
    self.backfill_reactions(fid, &mut summary.reactions).await?;
    self.backfill_links(fid, &mut summary.links).await?;
    self
      .backfill_verifications(fid, &mut summary.verifications)
      .await?;
    self.backfill_user_data(fid, &mut summary.user_data).await?;
    self
      .backfill_username_proofs(fid, &mut summary.username_proofs)
      .await?;

    info!(
      %fid,
      casts = summary.casts.stored,
      reactions = summary.reactions.stored,
      links = summary.links.stored,
      verifications = summary.verifications.stored,
      user_data = summary.user_data.stored,
      username_proofs = summary.username_proofs.stored,
      "backfill complete"
    );
    Ok(summary)
  }

  async fn backfill_casts(&self, fid: Fid, counts: &mut BackfillCounts) -> Result<()> {
    let mut page_token: Option<String> = None;

    loop {
      let page = self
        .hub
        .casts_by_fid(fid, page_token.as_deref())
        .await
        .map_err(Error::hub)?;
      counts.fetched += page.messages.len() as u64;

      let mut casts: Vec<_> =
        page.messages.iter().filter_map(decode_cast_add).collect();

      // Each resolution is an independent chain; fan out across the page.
      let roots =
        join_all(casts.iter().map(|cast| self.resolver.resolve(cast))).await;
      for (cast, root) in casts.iter_mut().zip(roots) {
        cast.root_parent = root?;
      }

      counts.stored += self
        .store
        .insert_casts_skip_duplicates(&casts)
        .await
        .map_err(Error::store)?;

      debug!(%fid, fetched = counts.fetched, "cast backfill page done");
      match page.next_page_token {
        Some(token) if !token.is_empty() => page_token = Some(token),
        _ => break,
      }
    }

    Ok(())
  }

  async fn backfill_reactions(
    &self,
    fid: Fid,
    counts: &mut BackfillCounts,
  ) -> Result<()> {
    let mut page_token: Option<String> = None;

    loop {
      let page = self
        .hub
        .reactions_by_fid(fid, page_token.as_deref())
        .await
        .map_err(Error::hub)?;
      counts.fetched += page.messages.len() as u64;

      let reactions: Vec<_> =
        page.messages.iter().filter_map(decode_reaction_add).collect();
      counts.stored += self
        .store
        .insert_reactions_skip_duplicates(&reactions)
        .await
        .map_err(Error::store)?;

      match page.next_page_token {
        Some(token) if !token.is_empty() => page_token = Some(token),
        _ => break,
      }
    }

    Ok(())
  }

  async fn backfill_links(&self, fid: Fid, counts: &mut BackfillCounts) -> Result<()> {
    let mut page_token: Option<String> = None;

    loop {
      let page = self
        .hub
        .links_by_fid(fid, page_token.as_deref())
        .await
        .map_err(Error::hub)?;
      counts.fetched += page.messages.len() as u64;

      let links: Vec<_> =
        page.messages.iter().filter_map(decode_link_add).collect();
      counts.stored += self
        .store
        .insert_links_skip_duplicates(&links)
        .await
        .map_err(Error::store)?;

      match page.next_page_token {
        Some(token) if !token.is_empty() => page_token = Some(token),
        _ => break,
      }
    }

    Ok(())
  }

  async fn backfill_verifications(
    &self,
    fid: Fid,
    counts: &mut BackfillCounts,
  ) -> Result<()> {
    let mut page_token: Option<String> = None;

    loop {
      let page = self
        .hub
        .verifications_by_fid(fid, page_token.as_deref())
        .await
        .map_err(Error::hub)?;
      counts.fetched += page.messages.len() as u64;

      let verifications: Vec<_> = page
        .messages
        .iter()
        .filter_map(decode_verification_add)
        .collect();
      counts.stored += self
        .store
        .insert_verifications_skip_duplicates(&verifications)
        .await
        .map_err(Error::store)?;

      match page.next_page_token {
        Some(token) if !token.is_empty() => page_token = Some(token),
        _ => break,
      }
    }

    Ok(())
  }

  async fn backfill_user_data(
    &self,
    fid: Fid,
    counts: &mut BackfillCounts,
  ) -> Result<()> {
    let mut page_token: Option<String> = None;

    loop {
      let page = self
        .hub
        .user_data_by_fid(fid, page_token.as_deref())
        .await
        .map_err(Error::hub)?;
      counts.fetched += page.messages.len() as u64;

      let data: Vec<_> =
        page.messages.iter().filter_map(decode_user_data).collect();
      counts.stored += self
        .store
        .insert_user_data_skip_duplicates(&data)
        .await
        .map_err(Error::store)?;

      match page.next_page_token {
        Some(token) if !token.is_empty() => page_token = Some(token),
        _ => break,
      }
    }

    Ok(())
  }

  async fn backfill_username_proofs(
    &self,
    fid: Fid,
    counts: &mut BackfillCounts,
  ) -> Result<()> {
    let mut page_token: Option<String> = None;

    loop {
      let page = self
        .hub
        .username_proofs_by_fid(fid, page_token.as_deref())
        .await
        .map_err(Error::hub)?;
      counts.fetched += page.messages.len() as u64;

      let proofs: Vec<_> =
        page.messages.iter().filter_map(decode_username_proof).collect();
      counts.stored += self
        .store
        .insert_username_proofs_skip_duplicates(&proofs)
        .await
        .map_err(Error::store)?;

      match page.next_page_token {
        Some(token) if !token.is_empty() => page_token = Some(token),
        _ => break,
      }
    }

    Ok(())
  }
}
