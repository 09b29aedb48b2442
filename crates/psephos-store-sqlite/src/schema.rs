//! SQL schema for the Psephos SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One table for all six levels. The ancestry columns are derived from the
-- parent on write and rewritten for the whole subtree on re-parent.
CREATE TABLE IF NOT EXISTS nodes (
    node_id       TEXT PRIMARY KEY,
    level         TEXT NOT NULL,   -- 'state' | 'division' | ... | 'booth'
    name          TEXT NOT NULL,
    code          TEXT,
    parent_id     TEXT REFERENCES nodes(node_id),
    state_id      TEXT,
    division_id   TEXT,
    parliament_id TEXT,
    assembly_id   TEXT,
    block_id      TEXT,
    details       TEXT NOT NULL,   -- JSON-encoded NodeDetails
    created_by    TEXT NOT NULL,
    updated_by    TEXT NOT NULL,
    created_at    TEXT NOT NULL,   -- RFC 3339 UTC
    updated_at    TEXT NOT NULL,
    UNIQUE (level, code)
);

CREATE TABLE IF NOT EXISTS facts (
    fact_id    TEXT PRIMARY KEY,
    kind       TEXT NOT NULL,      -- discriminant of FactValue variant
    body       TEXT NOT NULL,      -- JSON payload (inner data only)
    created_by TEXT NOT NULL,
    updated_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Natural keys, one row per key. The UNIQUE constraint is the final
-- arbiter between concurrent writers.
CREATE TABLE IF NOT EXISTS fact_keys (
    fact_id   TEXT NOT NULL REFERENCES facts(fact_id) ON DELETE CASCADE,
    kind      TEXT NOT NULL,
    key_name  TEXT NOT NULL,
    key_value TEXT NOT NULL,
    UNIQUE (kind, key_name, key_value)
);

-- Every id a fact points at, nodes and other facts alike.
CREATE TABLE IF NOT EXISTS fact_links (
    fact_id   TEXT NOT NULL REFERENCES facts(fact_id) ON DELETE CASCADE,
    field     TEXT NOT NULL,
    target_id TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS nodes_parent_idx      ON nodes(level, parent_id);
CREATE INDEX IF NOT EXISTS facts_kind_idx        ON facts(kind);
CREATE INDEX IF NOT EXISTS fact_keys_fact_idx    ON fact_keys(fact_id);
CREATE INDEX IF NOT EXISTS fact_links_target_idx ON fact_links(target_id);
CREATE INDEX IF NOT EXISTS fact_links_fact_idx   ON fact_links(fact_id, field);

PRAGMA user_version = 1;
";
