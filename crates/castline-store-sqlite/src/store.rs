//! [`SqliteStore`] — the SQLite implementation of [`IngestStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, params};

use castline_core::{
  id::Fid,
  record::{
    Cast, CastEmbed, CastMention, Link, Reaction, ReactionKind,
    ReactionTarget, UserData, UserDataKind, UsernameProof, Verification,
  },
  stats::{CastStats, ParentUrlStats, StatDelta, UserStats},
  store::{IngestStore, WriteOutcome},
};

use crate::{
  Error, Result,
  encode::{
    RawCast, RawLink, RawReaction, RawUserData, RawUsernameProof,
    RawVerification, encode_dt, encode_fid, encode_protocol,
    encode_reaction_kind, encode_user_data_kind,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A castline ingest store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

const CAST_COLUMNS: &str = "hash, fid, text, parent_hash, parent_fid, \
   parent_url, root_parent_hash, root_parent_fid, root_parent_url, \
   timestamp, deleted_at";

fn read_raw_cast(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawCast> {
  Ok(RawCast {
    hash:             row.get(0)?,
    fid:              row.get(1)?,
    text:             row.get(2)?,
    parent_hash:      row.get(3)?,
    parent_fid:       row.get(4)?,
    parent_url:       row.get(5)?,
    root_parent_hash: row.get(6)?,
    root_parent_fid:  row.get(7)?,
    root_parent_url:  row.get(8)?,
    timestamp:        row.get(9)?,
    deleted_at:       row.get(10)?,
  })
}

/// Reassemble a cast's embed list in body order from both embed tables.
fn read_embeds(
  conn: &rusqlite::Connection,
  cast_hash: &str,
) -> rusqlite::Result<Vec<CastEmbed>> {
  let mut entries: Vec<(i64, CastEmbed)> = Vec::new();

  let mut stmt = conn.prepare(
    "SELECT idx, embed_fid, embed_hash FROM cast_embed_casts
     WHERE cast_hash = ?1",
  )?;
  let rows = stmt.query_map(params![cast_hash], |r| {
    Ok((
      r.get::<_, i64>(0)?,
      CastEmbed::Cast {
        fid:  Fid(r.get::<_, i64>(1)? as u64),
        hash: r.get(2)?,
      },
    ))
  })?;
  for row in rows {
    entries.push(row?);
  }

  let mut stmt = conn.prepare(
    "SELECT idx, url FROM cast_embed_urls WHERE cast_hash = ?1",
  )?;
  let rows = stmt.query_map(params![cast_hash], |r| {
    Ok((r.get::<_, i64>(0)?, CastEmbed::Url { url: r.get(1)? }))
  })?;
  for row in rows {
    entries.push(row?);
  }

  entries.sort_by_key(|(idx, _)| *idx);
  Ok(entries.into_iter().map(|(_, embed)| embed).collect())
}

fn read_mentions(
  conn: &rusqlite::Connection,
  cast_hash: &str,
) -> rusqlite::Result<Vec<CastMention>> {
  let mut stmt = conn.prepare(
    "SELECT fid, position FROM cast_mentions
     WHERE cast_hash = ?1 ORDER BY idx",
  )?;
  let rows = stmt.query_map(params![cast_hash], |r| {
    Ok(CastMention {
      fid:      Fid(r.get::<_, i64>(0)? as u64),
      position: r.get::<_, i64>(1)? as u32,
    })
  })?;
  rows.collect()
}

/// Write (or resurrect) a cast's child rows. Content under a hash never
/// changes, so slot conflicts just clear the deletion marker.
fn write_cast_children(
  conn: &rusqlite::Connection,
  cast: &Cast,
) -> rusqlite::Result<()> {
  for (idx, embed) in cast.embeds.iter().enumerate() {
    match embed {
      CastEmbed::Cast { fid, hash } => {
        conn.execute(
          "INSERT INTO cast_embed_casts
             (cast_hash, idx, embed_fid, embed_hash, deleted_at)
           VALUES (?1, ?2, ?3, ?4, NULL)
           ON CONFLICT(cast_hash, idx) DO UPDATE SET
             embed_fid = excluded.embed_fid,
             embed_hash = excluded.embed_hash,
             deleted_at = NULL",
          params![cast.hash, idx as i64, encode_fid(*fid), hash],
        )?;
      }
      CastEmbed::Url { url } => {
        conn.execute(
          "INSERT INTO cast_embed_urls (cast_hash, idx, url, deleted_at)
           VALUES (?1, ?2, ?3, NULL)
           ON CONFLICT(cast_hash, idx) DO UPDATE SET
             url = excluded.url,
             deleted_at = NULL",
          params![cast.hash, idx as i64, url],
        )?;
      }
    }
  }

  for (idx, mention) in cast.mentions.iter().enumerate() {
    conn.execute(
      "INSERT INTO cast_mentions (cast_hash, idx, fid, position, deleted_at)
       VALUES (?1, ?2, ?3, ?4, NULL)
       ON CONFLICT(cast_hash, idx) DO UPDATE SET
         fid = excluded.fid,
         position = excluded.position,
         deleted_at = NULL",
      params![
        cast.hash,
        idx as i64,
        encode_fid(mention.fid),
        i64::from(mention.position)
      ],
    )?;
  }

  Ok(())
}

// ─── IngestStore impl ────────────────────────────────────────────────────────

impl IngestStore for SqliteStore {
  type Error = Error;

  // ── Casts ─────────────────────────────────────────────────────────────

  async fn upsert_cast(&self, cast: &Cast) -> Result<WriteOutcome> {
    let cast = cast.clone();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let existing: Option<Option<String>> = tx
          .query_row(
            "SELECT deleted_at FROM casts WHERE hash = ?1",
            params![cast.hash],
            |r| r.get(0),
          )
          .optional()?;

        let outcome = match existing {
          Some(None) => WriteOutcome::Duplicate,
          Some(Some(_)) => WriteOutcome::Resurrected,
          None => WriteOutcome::Inserted,
        };

        match outcome {
          WriteOutcome::Duplicate => {}
          WriteOutcome::Inserted => {
            tx.execute(
              "INSERT INTO casts
                 (hash, fid, text, parent_hash, parent_fid, parent_url,
                  root_parent_hash, root_parent_fid, root_parent_url,
                  timestamp, deleted_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, NULL)",
              params![
                cast.hash,
                encode_fid(cast.fid),
                cast.text,
                cast.parent.as_ref().map(|p| p.hash.clone()),
                cast.parent.as_ref().map(|p| encode_fid(p.fid)),
                cast.parent_url,
                cast.root_parent.hash,
                cast.root_parent.fid.map(encode_fid),
                cast.root_parent.url,
                encode_dt(cast.timestamp),
              ],
            )?;
            write_cast_children(&tx, &cast)?;
          }
          WriteOutcome::Resurrected => {
            // COALESCE keeps already-resolved roots: resolved once,
            // immutable thereafter.
            tx.execute(
              "UPDATE casts SET
                 fid = ?2, text = ?3, parent_hash = ?4, parent_fid = ?5,
                 parent_url = ?6,
                 root_parent_hash = COALESCE(root_parent_hash, ?7),
                 root_parent_fid  = COALESCE(root_parent_fid, ?8),
                 root_parent_url  = COALESCE(root_parent_url, ?9),
                 timestamp = ?10, deleted_at = NULL
               WHERE hash = ?1",
              params![
                cast.hash,
                encode_fid(cast.fid),
                cast.text,
                cast.parent.as_ref().map(|p| p.hash.clone()),
                cast.parent.as_ref().map(|p| encode_fid(p.fid)),
                cast.parent_url,
                cast.root_parent.hash,
                cast.root_parent.fid.map(encode_fid),
                cast.root_parent.url,
                encode_dt(cast.timestamp),
              ],
            )?;
            write_cast_children(&tx, &cast)?;
          }
        }

        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    Ok(outcome)
  }

  async fn get_cast(&self, hash: &str) -> Result<Option<Cast>> {
    let hash = hash.to_string();

    let raw = self
      .conn
      .call(move |conn| {
        let row = conn
          .query_row(
            &format!("SELECT {CAST_COLUMNS} FROM casts WHERE hash = ?1"),
            params![hash],
            read_raw_cast,
          )
          .optional()?;

        let Some(row) = row else { return Ok(None) };
        let embeds = read_embeds(conn, &hash)?;
        let mentions = read_mentions(conn, &hash)?;
        Ok(Some((row, embeds, mentions)))
      })
      .await?;

    raw
      .map(|(row, embeds, mentions)| row.into_cast(embeds, mentions))
      .transpose()
  }

  async fn soft_delete_cast(
    &self,
    hash: &str,
    at: DateTime<Utc>,
  ) -> Result<Option<Cast>> {
    let hash = hash.to_string();
    let at_str = encode_dt(at);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let row = tx
          .query_row(
            &format!(
              "SELECT {CAST_COLUMNS} FROM casts
               WHERE hash = ?1 AND deleted_at IS NULL"
            ),
            params![hash],
            read_raw_cast,
          )
          .optional()?;

        let Some(mut row) = row else { return Ok(None) };

        let embeds = read_embeds(&tx, &hash)?;
        let mentions = read_mentions(&tx, &hash)?;

        tx.execute(
          "UPDATE casts SET deleted_at = ?2
           WHERE hash = ?1 AND deleted_at IS NULL",
          params![hash, at_str],
        )?;
        // Child rows are owned by the cast; they go in the same step.
        tx.execute(
          "UPDATE cast_embed_casts SET deleted_at = ?2
           WHERE cast_hash = ?1 AND deleted_at IS NULL",
          params![hash, at_str],
        )?;
        tx.execute(
          "UPDATE cast_embed_urls SET deleted_at = ?2
           WHERE cast_hash = ?1 AND deleted_at IS NULL",
          params![hash, at_str],
        )?;
        tx.execute(
          "UPDATE cast_mentions SET deleted_at = ?2
           WHERE cast_hash = ?1 AND deleted_at IS NULL",
          params![hash, at_str],
        )?;

        tx.commit()?;
        row.deleted_at = Some(at_str);
        Ok(Some((row, embeds, mentions)))
      })
      .await?;

    raw
      .map(|(row, embeds, mentions)| row.into_cast(embeds, mentions))
      .transpose()
  }

  async fn insert_casts_skip_duplicates(&self, casts: &[Cast]) -> Result<u64> {
    let casts = casts.to_vec();

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut written = 0u64;

        for cast in &casts {
          let inserted = tx.execute(
            "INSERT OR IGNORE INTO casts
               (hash, fid, text, parent_hash, parent_fid, parent_url,
                root_parent_hash, root_parent_fid, root_parent_url,
                timestamp, deleted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, NULL)",
            params![
              cast.hash,
              encode_fid(cast.fid),
              cast.text,
              cast.parent.as_ref().map(|p| p.hash.clone()),
              cast.parent.as_ref().map(|p| encode_fid(p.fid)),
              cast.parent_url,
              cast.root_parent.hash,
              cast.root_parent.fid.map(encode_fid),
              cast.root_parent.url,
              encode_dt(cast.timestamp),
            ],
          )?;
          if inserted == 0 {
            continue;
          }
          written += 1;
          write_cast_children(&tx, cast)?;
        }

        tx.commit()?;
        Ok(written)
      })
      .await?;

    Ok(written)
  }

  // ── Reactions ─────────────────────────────────────────────────────────

  async fn upsert_reaction(&self, reaction: &Reaction) -> Result<WriteOutcome> {
    let reaction = reaction.clone();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let kind = encode_reaction_kind(reaction.kind);
        let fid = encode_fid(reaction.fid);
        let ts = encode_dt(reaction.timestamp);

        let outcome = match &reaction.target {
          ReactionTarget::Cast { fid: target_fid, hash } => {
            let existing: Option<Option<String>> = tx
              .query_row(
                "SELECT deleted_at FROM cast_reactions
                 WHERE target_hash = ?1 AND reaction_type = ?2 AND fid = ?3",
                params![hash, kind, fid],
                |r| r.get(0),
              )
              .optional()?;

            match existing {
              Some(None) => WriteOutcome::Duplicate,
              Some(Some(_)) => {
                tx.execute(
                  "UPDATE cast_reactions SET
                     target_fid = ?4, timestamp = ?5, deleted_at = NULL
                   WHERE target_hash = ?1 AND reaction_type = ?2 AND fid = ?3",
                  params![hash, kind, fid, encode_fid(*target_fid), ts],
                )?;
                WriteOutcome::Resurrected
              }
              None => {
                tx.execute(
                  "INSERT INTO cast_reactions
                     (target_hash, reaction_type, fid, target_fid,
                      timestamp, deleted_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, NULL)",
                  params![hash, kind, fid, encode_fid(*target_fid), ts],
                )?;
                WriteOutcome::Inserted
              }
            }
          }
          ReactionTarget::Url { url } => {
            let existing: Option<Option<String>> = tx
              .query_row(
                "SELECT deleted_at FROM url_reactions
                 WHERE target_url = ?1 AND reaction_type = ?2 AND fid = ?3",
                params![url, kind, fid],
                |r| r.get(0),
              )
              .optional()?;

            match existing {
              Some(None) => WriteOutcome::Duplicate,
              Some(Some(_)) => {
                tx.execute(
                  "UPDATE url_reactions SET timestamp = ?4, deleted_at = NULL
                   WHERE target_url = ?1 AND reaction_type = ?2 AND fid = ?3",
                  params![url, kind, fid, ts],
                )?;
                WriteOutcome::Resurrected
              }
              None => {
                tx.execute(
                  "INSERT INTO url_reactions
                     (target_url, reaction_type, fid, timestamp, deleted_at)
                   VALUES (?1, ?2, ?3, ?4, NULL)",
                  params![url, kind, fid, ts],
                )?;
                WriteOutcome::Inserted
              }
            }
          }
        };

        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    Ok(outcome)
  }

  async fn get_reaction(
    &self,
    kind: ReactionKind,
    fid: Fid,
    target: &ReactionTarget,
  ) -> Result<Option<Reaction>> {
    let target = target.clone();
    let kind_v = encode_reaction_kind(kind);
    let fid_v = encode_fid(fid);

    let raw = self
      .conn
      .call(move |conn| {
        let raw = match &target {
          ReactionTarget::Cast { hash, .. } => conn
            .query_row(
              "SELECT fid, target_fid, timestamp, deleted_at
               FROM cast_reactions
               WHERE target_hash = ?1 AND reaction_type = ?2 AND fid = ?3",
              params![hash, kind_v, fid_v],
              |r| {
                Ok(RawReaction {
                  kind:        kind_v,
                  fid:         r.get(0)?,
                  target_hash: Some(hash.clone()),
                  target_fid:  Some(r.get(1)?),
                  target_url:  None,
                  timestamp:   r.get(2)?,
                  deleted_at:  r.get(3)?,
                })
              },
            )
            .optional()?,
          ReactionTarget::Url { url } => conn
            .query_row(
              "SELECT fid, timestamp, deleted_at FROM url_reactions
               WHERE target_url = ?1 AND reaction_type = ?2 AND fid = ?3",
              params![url, kind_v, fid_v],
              |r| {
                Ok(RawReaction {
                  kind:        kind_v,
                  fid:         r.get(0)?,
                  target_hash: None,
                  target_fid:  None,
                  target_url:  Some(url.clone()),
                  timestamp:   r.get(1)?,
                  deleted_at:  r.get(2)?,
                })
              },
            )
            .optional()?,
        };
        Ok(raw)
      })
      .await?;

    raw.map(RawReaction::into_reaction).transpose()
  }

  async fn soft_delete_reaction(
    &self,
    kind: ReactionKind,
    fid: Fid,
    target: &ReactionTarget,
    at: DateTime<Utc>,
  ) -> Result<Option<Reaction>> {
    let target = target.clone();
    let kind_v = encode_reaction_kind(kind);
    let fid_v = encode_fid(fid);
    let at_str = encode_dt(at);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let raw = match &target {
          ReactionTarget::Cast { hash, .. } => {
            let row = tx
              .query_row(
                "SELECT fid, target_fid, timestamp FROM cast_reactions
                 WHERE target_hash = ?1 AND reaction_type = ?2 AND fid = ?3
                   AND deleted_at IS NULL",
                params![hash, kind_v, fid_v],
                |r| {
                  Ok(RawReaction {
                    kind:        kind_v,
                    fid:         r.get(0)?,
                    target_hash: Some(hash.clone()),
                    target_fid:  Some(r.get(1)?),
                    target_url:  None,
                    timestamp:   r.get(2)?,
                    deleted_at:  Some(at_str.clone()),
                  })
                },
              )
              .optional()?;
            if row.is_some() {
              tx.execute(
                "UPDATE cast_reactions SET deleted_at = ?4
                 WHERE target_hash = ?1 AND reaction_type = ?2 AND fid = ?3
                   AND deleted_at IS NULL",
                params![hash, kind_v, fid_v, at_str],
              )?;
            }
            row
          }
          ReactionTarget::Url { url } => {
            let row = tx
              .query_row(
                "SELECT fid, timestamp FROM url_reactions
                 WHERE target_url = ?1 AND reaction_type = ?2 AND fid = ?3
                   AND deleted_at IS NULL",
                params![url, kind_v, fid_v],
                |r| {
                  Ok(RawReaction {
                    kind:        kind_v,
                    fid:         r.get(0)?,
                    target_hash: None,
                    target_fid:  None,
                    target_url:  Some(url.clone()),
                    timestamp:   r.get(1)?,
                    deleted_at:  Some(at_str.clone()),
                  })
                },
              )
              .optional()?;
            if row.is_some() {
              tx.execute(
                "UPDATE url_reactions SET deleted_at = ?4
                 WHERE target_url = ?1 AND reaction_type = ?2 AND fid = ?3
                   AND deleted_at IS NULL",
                params![url, kind_v, fid_v, at_str],
              )?;
            }
            row
          }
        };

        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawReaction::into_reaction).transpose()
  }

  async fn insert_reactions_skip_duplicates(
    &self,
    reactions: &[Reaction],
  ) -> Result<u64> {
    let reactions = reactions.to_vec();

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut written = 0u64;

        for reaction in &reactions {
          let kind = encode_reaction_kind(reaction.kind);
          let fid = encode_fid(reaction.fid);
          let ts = encode_dt(reaction.timestamp);

          let inserted = match &reaction.target {
            ReactionTarget::Cast { fid: target_fid, hash } => tx.execute(
              "INSERT OR IGNORE INTO cast_reactions
                 (target_hash, reaction_type, fid, target_fid,
                  timestamp, deleted_at)
               VALUES (?1, ?2, ?3, ?4, ?5, NULL)",
              params![hash, kind, fid, encode_fid(*target_fid), ts],
            )?,
            ReactionTarget::Url { url } => tx.execute(
              "INSERT OR IGNORE INTO url_reactions
                 (target_url, reaction_type, fid, timestamp, deleted_at)
               VALUES (?1, ?2, ?3, ?4, NULL)",
              params![url, kind, fid, ts],
            )?,
          };
          written += inserted as u64;
        }

        tx.commit()?;
        Ok(written)
      })
      .await?;

    Ok(written)
  }

  // ── Links ─────────────────────────────────────────────────────────────

  async fn upsert_link(&self, link: &Link) -> Result<WriteOutcome> {
    let link = link.clone();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let fid = encode_fid(link.fid);
        let target = encode_fid(link.target_fid);
        let ts = encode_dt(link.timestamp);

        let existing: Option<Option<String>> = tx
          .query_row(
            "SELECT deleted_at FROM links
             WHERE fid = ?1 AND link_type = ?2 AND target_fid = ?3",
            params![fid, link.link_type, target],
            |r| r.get(0),
          )
          .optional()?;

        let outcome = match existing {
          Some(None) => WriteOutcome::Duplicate,
          Some(Some(_)) => {
            tx.execute(
              "UPDATE links SET timestamp = ?4, deleted_at = NULL
               WHERE fid = ?1 AND link_type = ?2 AND target_fid = ?3",
              params![fid, link.link_type, target, ts],
            )?;
            WriteOutcome::Resurrected
          }
          None => {
            tx.execute(
              "INSERT INTO links (fid, link_type, target_fid, timestamp, deleted_at)
               VALUES (?1, ?2, ?3, ?4, NULL)",
              params![fid, link.link_type, target, ts],
            )?;
            WriteOutcome::Inserted
          }
        };

        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    Ok(outcome)
  }

  async fn get_link(
    &self,
    fid: Fid,
    link_type: &str,
    target_fid: Fid,
  ) -> Result<Option<Link>> {
    let link_type = link_type.to_string();
    let fid_v = encode_fid(fid);
    let target_v = encode_fid(target_fid);

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT fid, link_type, target_fid, timestamp, deleted_at
               FROM links
               WHERE fid = ?1 AND link_type = ?2 AND target_fid = ?3",
              params![fid_v, link_type, target_v],
              |r| {
                Ok(RawLink {
                  fid:        r.get(0)?,
                  link_type:  r.get(1)?,
                  target_fid: r.get(2)?,
                  timestamp:  r.get(3)?,
                  deleted_at: r.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawLink::into_link).transpose()
  }

  async fn soft_delete_link(
    &self,
    fid: Fid,
    link_type: &str,
    target_fid: Fid,
    at: DateTime<Utc>,
  ) -> Result<Option<Link>> {
    let link_type = link_type.to_string();
    let fid_v = encode_fid(fid);
    let target_v = encode_fid(target_fid);
    let at_str = encode_dt(at);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let row = tx
          .query_row(
            "SELECT fid, link_type, target_fid, timestamp FROM links
             WHERE fid = ?1 AND link_type = ?2 AND target_fid = ?3
               AND deleted_at IS NULL",
            params![fid_v, link_type, target_v],
            |r| {
              Ok(RawLink {
                fid:        r.get(0)?,
                link_type:  r.get(1)?,
                target_fid: r.get(2)?,
                timestamp:  r.get(3)?,
                deleted_at: Some(at_str.clone()),
              })
            },
          )
          .optional()?;

        if row.is_some() {
          tx.execute(
            "UPDATE links SET deleted_at = ?4
             WHERE fid = ?1 AND link_type = ?2 AND target_fid = ?3
               AND deleted_at IS NULL",
            params![fid_v, link_type, target_v, at_str],
          )?;
        }

        tx.commit()?;
        Ok(row)
      })
      .await?;

    raw.map(RawLink::into_link).transpose()
  }

  async fn insert_links_skip_duplicates(&self, links: &[Link]) -> Result<u64> {
    let links = links.to_vec();

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut written = 0u64;

        for link in &links {
          written += tx.execute(
            "INSERT OR IGNORE INTO links
               (fid, link_type, target_fid, timestamp, deleted_at)
             VALUES (?1, ?2, ?3, ?4, NULL)",
            params![
              encode_fid(link.fid),
              link.link_type,
              encode_fid(link.target_fid),
              encode_dt(link.timestamp),
            ],
          )? as u64;
        }

        tx.commit()?;
        Ok(written)
      })
      .await?;

    Ok(written)
  }

  // ── Verifications ─────────────────────────────────────────────────────

  async fn upsert_verification(
    &self,
    verification: &Verification,
  ) -> Result<WriteOutcome> {
    let verification = verification.clone();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let fid = encode_fid(verification.fid);
        let protocol = encode_protocol(verification.protocol);
        let ts = encode_dt(verification.timestamp);

        let existing: Option<Option<String>> = tx
          .query_row(
            "SELECT deleted_at FROM verifications
             WHERE fid = ?1 AND address = ?2",
            params![fid, verification.address],
            |r| r.get(0),
          )
          .optional()?;

        let outcome = match existing {
          Some(None) => WriteOutcome::Duplicate,
          Some(Some(_)) => {
            tx.execute(
              "UPDATE verifications SET
                 protocol = ?3, timestamp = ?4, deleted_at = NULL
               WHERE fid = ?1 AND address = ?2",
              params![fid, verification.address, protocol, ts],
            )?;
            WriteOutcome::Resurrected
          }
          None => {
            tx.execute(
              "INSERT INTO verifications
                 (fid, address, protocol, timestamp, deleted_at)
               VALUES (?1, ?2, ?3, ?4, NULL)",
              params![fid, verification.address, protocol, ts],
            )?;
            WriteOutcome::Inserted
          }
        };

        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    Ok(outcome)
  }

  async fn get_verification(
    &self,
    fid: Fid,
    address: &str,
  ) -> Result<Option<Verification>> {
    let address = address.to_string();
    let fid_v = encode_fid(fid);

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT fid, address, protocol, timestamp, deleted_at
               FROM verifications WHERE fid = ?1 AND address = ?2",
              params![fid_v, address],
              |r| {
                Ok(RawVerification {
                  fid:        r.get(0)?,
                  address:    r.get(1)?,
                  protocol:   r.get(2)?,
                  timestamp:  r.get(3)?,
                  deleted_at: r.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawVerification::into_verification).transpose()
  }

  async fn soft_delete_verification(
    &self,
    fid: Fid,
    address: &str,
    at: DateTime<Utc>,
  ) -> Result<Option<Verification>> {
    let address = address.to_string();
    let fid_v = encode_fid(fid);
    let at_str = encode_dt(at);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let row = tx
          .query_row(
            "SELECT fid, address, protocol, timestamp FROM verifications
             WHERE fid = ?1 AND address = ?2 AND deleted_at IS NULL",
            params![fid_v, address],
            |r| {
              Ok(RawVerification {
                fid:        r.get(0)?,
                address:    r.get(1)?,
                protocol:   r.get(2)?,
                timestamp:  r.get(3)?,
                deleted_at: Some(at_str.clone()),
              })
            },
          )
          .optional()?;

        if row.is_some() {
          tx.execute(
            "UPDATE verifications SET deleted_at = ?3
             WHERE fid = ?1 AND address = ?2 AND deleted_at IS NULL",
            params![fid_v, address, at_str],
          )?;
        }

        tx.commit()?;
        Ok(row)
      })
      .await?;

    raw.map(RawVerification::into_verification).transpose()
  }

  async fn insert_verifications_skip_duplicates(
    &self,
    verifications: &[Verification],
  ) -> Result<u64> {
    let verifications = verifications.to_vec();

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut written = 0u64;

        for verification in &verifications {
          written += tx.execute(
            "INSERT OR IGNORE INTO verifications
               (fid, address, protocol, timestamp, deleted_at)
             VALUES (?1, ?2, ?3, ?4, NULL)",
            params![
              encode_fid(verification.fid),
              verification.address,
              encode_protocol(verification.protocol),
              encode_dt(verification.timestamp),
            ],
          )? as u64;
        }

        tx.commit()?;
        Ok(written)
      })
      .await?;

    Ok(written)
  }

  // ── User data / username proofs ───────────────────────────────────────

  async fn upsert_user_data(&self, data: &UserData) -> Result<WriteOutcome> {
    let data = data.clone();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let fid = encode_fid(data.fid);
        let kind = encode_user_data_kind(data.kind);
        let ts = encode_dt(data.timestamp);

        let existing: Option<(String, String)> = tx
          .query_row(
            "SELECT value, timestamp FROM user_data
             WHERE fid = ?1 AND type = ?2",
            params![fid, kind],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;

        // Fixed-width timestamps: string order is time order.
        let outcome = match existing {
          Some((_, stored_ts)) if stored_ts > ts => WriteOutcome::Duplicate,
          Some((value, stored_ts)) if stored_ts == ts && value == data.value => {
            WriteOutcome::Duplicate
          }
          Some(_) => {
            tx.execute(
              "UPDATE user_data SET value = ?3, timestamp = ?4
               WHERE fid = ?1 AND type = ?2",
              params![fid, kind, data.value, ts],
            )?;
            WriteOutcome::Inserted
          }
          None => {
            tx.execute(
              "INSERT INTO user_data (fid, type, value, timestamp)
               VALUES (?1, ?2, ?3, ?4)",
              params![fid, kind, data.value, ts],
            )?;
            WriteOutcome::Inserted
          }
        };

        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    Ok(outcome)
  }

  async fn get_user_data(
    &self,
    fid: Fid,
    kind: UserDataKind,
  ) -> Result<Option<UserData>> {
    let fid_v = encode_fid(fid);
    let kind_s = encode_user_data_kind(kind);

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT fid, type, value, timestamp FROM user_data
               WHERE fid = ?1 AND type = ?2",
              params![fid_v, kind_s],
              |r| {
                Ok(RawUserData {
                  fid:       r.get(0)?,
                  kind:      r.get(1)?,
                  value:     r.get(2)?,
                  timestamp: r.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUserData::into_user_data).transpose()
  }

  async fn insert_user_data_skip_duplicates(
    &self,
    data: &[UserData],
  ) -> Result<u64> {
    let data = data.to_vec();

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut written = 0u64;

        for d in &data {
          written += tx.execute(
            "INSERT OR IGNORE INTO user_data (fid, type, value, timestamp)
             VALUES (?1, ?2, ?3, ?4)",
            params![
              encode_fid(d.fid),
              encode_user_data_kind(d.kind),
              d.value,
              encode_dt(d.timestamp),
            ],
          )? as u64;
        }

        tx.commit()?;
        Ok(written)
      })
      .await?;

    Ok(written)
  }

  async fn upsert_username_proof(
    &self,
    proof: &UsernameProof,
  ) -> Result<WriteOutcome> {
    let proof = proof.clone();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let fid = encode_fid(proof.fid);
        let ts = encode_dt(proof.timestamp);

        let existing: Option<(i64, String, String)> = tx
          .query_row(
            "SELECT fid, owner, timestamp FROM username_proofs
             WHERE username = ?1",
            params![proof.username],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
          )
          .optional()?;

        let outcome = match existing {
          Some((_, _, stored_ts)) if stored_ts > ts => WriteOutcome::Duplicate,
          Some((stored_fid, owner, stored_ts))
            if stored_ts == ts && stored_fid == fid && owner == proof.owner =>
          {
            WriteOutcome::Duplicate
          }
          Some(_) => {
            tx.execute(
              "UPDATE username_proofs SET fid = ?2, owner = ?3, timestamp = ?4
               WHERE username = ?1",
              params![proof.username, fid, proof.owner, ts],
            )?;
            WriteOutcome::Inserted
          }
          None => {
            tx.execute(
              "INSERT INTO username_proofs (username, fid, owner, timestamp)
               VALUES (?1, ?2, ?3, ?4)",
              params![proof.username, fid, proof.owner, ts],
            )?;
            WriteOutcome::Inserted
          }
        };

        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    Ok(outcome)
  }

  async fn get_username_proof(
    &self,
    username: &str,
  ) -> Result<Option<UsernameProof>> {
    let username = username.to_string();

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT username, fid, owner, timestamp FROM username_proofs
               WHERE username = ?1",
              params![username],
              |r| {
                Ok(RawUsernameProof {
                  username:  r.get(0)?,
                  fid:       r.get(1)?,
                  owner:     r.get(2)?,
                  timestamp: r.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUsernameProof::into_proof).transpose()
  }

  async fn insert_username_proofs_skip_duplicates(
    &self,
    proofs: &[UsernameProof],
  ) -> Result<u64> {
    let proofs = proofs.to_vec();

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut written = 0u64;

        for proof in &proofs {
          written += tx.execute(
            "INSERT OR IGNORE INTO username_proofs
               (username, fid, owner, timestamp)
             VALUES (?1, ?2, ?3, ?4)",
            params![
              proof.username,
              encode_fid(proof.fid),
              proof.owner,
              encode_dt(proof.timestamp),
            ],
          )? as u64;
        }

        tx.commit()?;
        Ok(written)
      })
      .await?;

    Ok(written)
  }

  // ── Derived counters ──────────────────────────────────────────────────

  async fn apply_stat_deltas(&self, deltas: &[StatDelta]) -> Result<()> {
    let deltas = deltas.to_vec();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        for delta in &deltas {
          match delta {
            StatDelta::Cast { hash, field, delta } => {
              let col = field.column();
              tx.execute(
                &format!(
                  "INSERT INTO cast_stats (hash, {col})
                   VALUES (?1, MAX(?2, 0))
                   ON CONFLICT(hash) DO UPDATE SET {col} = MAX({col} + ?2, 0)"
                ),
                params![hash, delta],
              )?;
            }
            StatDelta::User { fid, field, delta } => {
              let col = field.column();
              tx.execute(
                &format!(
                  "INSERT INTO user_stats (fid, {col})
                   VALUES (?1, MAX(?2, 0))
                   ON CONFLICT(fid) DO UPDATE SET {col} = MAX({col} + ?2, 0)"
                ),
                params![encode_fid(*fid), delta],
              )?;
            }
            StatDelta::ParentUrl { url, field, delta } => {
              let col = field.column();
              tx.execute(
                &format!(
                  "INSERT INTO parent_url_stats (url, {col})
                   VALUES (?1, MAX(?2, 0))
                   ON CONFLICT(url) DO UPDATE SET {col} = MAX({col} + ?2, 0)"
                ),
                params![url, delta],
              )?;
            }
          }
        }

        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(())
  }

  async fn cast_stats(&self, hash: &str) -> Result<CastStats> {
    let hash = hash.to_string();

    let stats = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT likes, recasts, replies, quotes FROM cast_stats
               WHERE hash = ?1",
              params![hash],
              |r| {
                Ok(CastStats {
                  likes:   r.get(0)?,
                  recasts: r.get(1)?,
                  replies: r.get(2)?,
                  quotes:  r.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    Ok(stats.unwrap_or_default())
  }

  async fn user_stats(&self, fid: Fid) -> Result<UserStats> {
    let fid_v = encode_fid(fid);

    let stats = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT casts, replies, replies_received, likes, likes_received,
                      recasts, recasts_received, following, followers
               FROM user_stats WHERE fid = ?1",
              params![fid_v],
              |r| {
                Ok(UserStats {
                  casts:            r.get(0)?,
                  replies:          r.get(1)?,
                  replies_received: r.get(2)?,
                  likes:            r.get(3)?,
                  likes_received:   r.get(4)?,
                  recasts:          r.get(5)?,
                  recasts_received: r.get(6)?,
                  following:        r.get(7)?,
                  followers:        r.get(8)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    Ok(stats.unwrap_or_default())
  }

  async fn parent_url_stats(&self, url: &str) -> Result<ParentUrlStats> {
    let url = url.to_string();

    let stats = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT casts, replies FROM parent_url_stats WHERE url = ?1",
              params![url],
              |r| Ok(ParentUrlStats { casts: r.get(0)?, replies: r.get(1)? }),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(stats.unwrap_or_default())
  }
}
