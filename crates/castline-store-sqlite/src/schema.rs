//! SQL schema for the castline SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated
//! on `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Casts are soft-deleted, never hard-deleted. Root-parent columns are
-- written once and never re-resolved on later writes.
CREATE TABLE IF NOT EXISTS casts (
    hash             TEXT PRIMARY KEY,
    fid              INTEGER NOT NULL,
    text             TEXT NOT NULL,
    parent_hash      TEXT,
    parent_fid       INTEGER,
    parent_url       TEXT,
    root_parent_hash TEXT,
    root_parent_fid  INTEGER,
    root_parent_url  TEXT,
    timestamp        TEXT NOT NULL,   -- RFC 3339 UTC, fixed width
    deleted_at       TEXT
);

-- Embed/mention child rows are owned by their cast and soft-deleted in
-- lockstep with it. `idx` is the slot position in the cast body, shared
-- across both embed tables so body order can be reconstructed.
CREATE TABLE IF NOT EXISTS cast_embed_casts (
    cast_hash  TEXT NOT NULL REFERENCES casts(hash),
    idx        INTEGER NOT NULL,
    embed_fid  INTEGER NOT NULL,
    embed_hash TEXT NOT NULL,
    deleted_at TEXT,
    PRIMARY KEY (cast_hash, idx)
);

CREATE TABLE IF NOT EXISTS cast_embed_urls (
    cast_hash  TEXT NOT NULL REFERENCES casts(hash),
    idx        INTEGER NOT NULL,
    url        TEXT NOT NULL,
    deleted_at TEXT,
    PRIMARY KEY (cast_hash, idx)
);

CREATE TABLE IF NOT EXISTS cast_mentions (
    cast_hash  TEXT NOT NULL REFERENCES casts(hash),
    idx        INTEGER NOT NULL,
    fid        INTEGER NOT NULL,
    position   INTEGER NOT NULL,   -- byte offset into the UTF-8 text
    deleted_at TEXT,
    PRIMARY KEY (cast_hash, idx)
);

CREATE TABLE IF NOT EXISTS links (
    fid        INTEGER NOT NULL,
    link_type  TEXT NOT NULL,
    target_fid INTEGER NOT NULL,
    timestamp  TEXT NOT NULL,
    deleted_at TEXT,
    PRIMARY KEY (fid, link_type, target_fid)
);

-- target_fid is denormalized from the add message; remove messages do
-- not carry it, so decrements read it back from here.
CREATE TABLE IF NOT EXISTS cast_reactions (
    target_hash   TEXT NOT NULL,
    reaction_type INTEGER NOT NULL,   -- 1 = like, 2 = recast
    fid           INTEGER NOT NULL,
    target_fid    INTEGER NOT NULL,
    timestamp     TEXT NOT NULL,
    deleted_at    TEXT,
    PRIMARY KEY (target_hash, reaction_type, fid)
);

CREATE TABLE IF NOT EXISTS url_reactions (
    target_url    TEXT NOT NULL,
    reaction_type INTEGER NOT NULL,
    fid           INTEGER NOT NULL,
    timestamp     TEXT NOT NULL,
    deleted_at    TEXT,
    PRIMARY KEY (target_url, reaction_type, fid)
);

CREATE TABLE IF NOT EXISTS verifications (
    fid        INTEGER NOT NULL,
    address    TEXT NOT NULL,
    protocol   TEXT NOT NULL,   -- 'ethereum' | 'solana'
    timestamp  TEXT NOT NULL,
    deleted_at TEXT,
    PRIMARY KEY (fid, address)
);

-- Last-write-wins; no soft-delete state exists for these two tables.
CREATE TABLE IF NOT EXISTS user_data (
    fid       INTEGER NOT NULL,
    type      TEXT NOT NULL,
    value     TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    PRIMARY KEY (fid, type)
);

CREATE TABLE IF NOT EXISTS username_proofs (
    username  TEXT PRIMARY KEY,
    fid       INTEGER NOT NULL,
    owner     TEXT NOT NULL,
    timestamp TEXT NOT NULL
);

-- Derived counters. Not authoritative: a cache maintained in lockstep
-- with entity lifecycle, floored at zero.
CREATE TABLE IF NOT EXISTS cast_stats (
    hash    TEXT PRIMARY KEY,
    likes   INTEGER NOT NULL DEFAULT 0,
    recasts INTEGER NOT NULL DEFAULT 0,
    replies INTEGER NOT NULL DEFAULT 0,
    quotes  INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS user_stats (
    fid              INTEGER PRIMARY KEY,
    casts            INTEGER NOT NULL DEFAULT 0,
    replies          INTEGER NOT NULL DEFAULT 0,
    replies_received INTEGER NOT NULL DEFAULT 0,
    likes            INTEGER NOT NULL DEFAULT 0,
    likes_received   INTEGER NOT NULL DEFAULT 0,
    recasts          INTEGER NOT NULL DEFAULT 0,
    recasts_received INTEGER NOT NULL DEFAULT 0,
    following        INTEGER NOT NULL DEFAULT 0,
    followers        INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS parent_url_stats (
    url     TEXT PRIMARY KEY,
    casts   INTEGER NOT NULL DEFAULT 0,
    replies INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS casts_fid_idx          ON casts(fid);
CREATE INDEX IF NOT EXISTS casts_parent_idx       ON casts(parent_hash);
CREATE INDEX IF NOT EXISTS casts_root_parent_idx  ON casts(root_parent_hash);
CREATE INDEX IF NOT EXISTS links_target_idx       ON links(target_fid);
CREATE INDEX IF NOT EXISTS cast_reactions_fid_idx ON cast_reactions(fid);

PRAGMA user_version = 1;
";
