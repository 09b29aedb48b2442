//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, and
//! node details and fact bodies compact JSON.

use chrono::{DateTime, Utc};
use psephos_core::{
  audit::Audit,
  fact::{Fact, FactKind, FactValue},
  hierarchy::{Ancestry, AssemblyCategory, Level, Node, NodeDetails},
  rollup::NodeSummary,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

/// `LIMIT ? OFFSET ?` bindings. No limit binds `-1`; an offset beyond
/// `i64::MAX` clamps to it, which SQLite answers with no rows.
pub fn limit_offset(limit: Option<u64>, offset: Option<u64>) -> [rusqlite::types::Value; 2] {
  use rusqlite::types::Value;
  [
    Value::Integer(limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX))),
    Value::Integer(offset.map_or(0, |o| i64::try_from(o).unwrap_or(i64::MAX))),
  ]
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_category(s: &str) -> Result<AssemblyCategory> {
  Ok(serde_json::from_value(serde_json::Value::String(s.to_owned()))?)
}

// ─── Audit ───────────────────────────────────────────────────────────────────

/// `(created_by, updated_by, created_at, updated_at)` as stored.
pub struct EncodedAudit {
  pub created_by: String,
  pub updated_by: String,
  pub created_at: String,
  pub updated_at: String,
}

pub fn encode_audit(audit: &Audit) -> EncodedAudit {
  EncodedAudit {
    created_by: encode_uuid(audit.created_by),
    updated_by: encode_uuid(audit.updated_by),
    created_at: encode_dt(audit.created_at),
    updated_at: encode_dt(audit.updated_at),
  }
}

fn decode_audit(a: &EncodedAudit) -> Result<Audit> {
  Ok(Audit {
    created_by: decode_uuid(&a.created_by)?,
    updated_by: decode_uuid(&a.updated_by)?,
    created_at: decode_dt(&a.created_at)?,
    updated_at: decode_dt(&a.updated_at)?,
  })
}

// ─── Nodes ───────────────────────────────────────────────────────────────────

pub const NODE_COLUMNS: &str = "node_id, level, name, code, parent_id, state_id, division_id, \
                                parliament_id, assembly_id, block_id, details, created_by, \
                                updated_by, created_at, updated_at";

/// Every column of a `nodes` row, encoded for binding or as read.
pub struct RawNode {
  pub node_id:       String,
  pub level:         String,
  pub name:          String,
  pub code:          Option<String>,
  pub parent_id:     Option<String>,
  pub state_id:      Option<String>,
  pub division_id:   Option<String>,
  pub parliament_id: Option<String>,
  pub assembly_id:   Option<String>,
  pub block_id:      Option<String>,
  pub details:       String,
  pub audit:         EncodedAudit,
}

impl RawNode {
  pub fn encode(node: &Node) -> Result<Self> {
    let anc = |level| node.ancestry.get(level).map(encode_uuid);
    Ok(Self {
      node_id:       encode_uuid(node.id),
      level:         node.level().as_str().to_owned(),
      name:          node.name.clone(),
      code:          node.code.clone(),
      parent_id:     node.parent_id.map(encode_uuid),
      state_id:      anc(Level::State),
      division_id:   anc(Level::Division),
      parliament_id: anc(Level::Parliament),
      assembly_id:   anc(Level::Assembly),
      block_id:      anc(Level::Block),
      details:       serde_json::to_string(&node.details)?,
      audit:         encode_audit(&node.audit),
    })
  }

  /// Read a row selected with [`NODE_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      node_id:       row.get(0)?,
      level:         row.get(1)?,
      name:          row.get(2)?,
      code:          row.get(3)?,
      parent_id:     row.get(4)?,
      state_id:      row.get(5)?,
      division_id:   row.get(6)?,
      parliament_id: row.get(7)?,
      assembly_id:   row.get(8)?,
      block_id:      row.get(9)?,
      details:       row.get(10)?,
      audit:         EncodedAudit {
        created_by: row.get(11)?,
        updated_by: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
      },
    })
  }

  pub fn into_node(self) -> Result<Node> {
    let level: Level = self.level.parse()?;
    let details: NodeDetails = serde_json::from_str(&self.details)?;
    if details.level() != level {
      return Err(Error::Corrupt(format!(
        "node {} is stored as {level} but carries {} details",
        self.node_id,
        details.level()
      )));
    }
    Ok(Node {
      id: decode_uuid(&self.node_id)?,
      name: self.name,
      code: self.code,
      parent_id: decode_opt_uuid(self.parent_id)?,
      ancestry: Ancestry {
        state_id:      decode_opt_uuid(self.state_id)?,
        division_id:   decode_opt_uuid(self.division_id)?,
        parliament_id: decode_opt_uuid(self.parliament_id)?,
        assembly_id:   decode_opt_uuid(self.assembly_id)?,
        block_id:      decode_opt_uuid(self.block_id)?,
      },
      details,
      audit: decode_audit(&self.audit)?,
    })
  }
}

// ─── Facts ───────────────────────────────────────────────────────────────────

pub const FACT_COLUMNS: &str =
  "f.fact_id, f.kind, f.body, f.created_by, f.updated_by, f.created_at, f.updated_at";

pub struct RawFact {
  pub fact_id: String,
  pub kind:    String,
  pub body:    String,
  pub audit:   EncodedAudit,
}

impl RawFact {
  pub fn encode(fact: &Fact) -> Result<Self> {
    Ok(Self {
      fact_id: encode_uuid(fact.fact_id),
      kind:    fact.kind().as_str().to_owned(),
      body:    fact.value.to_json()?.to_string(),
      audit:   encode_audit(&fact.audit),
    })
  }

  /// Read a row selected with [`FACT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      fact_id: row.get(0)?,
      kind:    row.get(1)?,
      body:    row.get(2)?,
      audit:   EncodedAudit {
        created_by: row.get(3)?,
        updated_by: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
      },
    })
  }

  pub fn into_fact(self) -> Result<Fact> {
    let kind: FactKind = self.kind.parse()?;
    let body: serde_json::Value = serde_json::from_str(&self.body)?;
    Ok(Fact {
      fact_id: decode_uuid(&self.fact_id)?,
      value:   FactValue::from_parts(kind, body)?,
      audit:   decode_audit(&self.audit)?,
    })
  }
}

// ─── Roll-up ─────────────────────────────────────────────────────────────────

/// One node's columns in a roll-up row; all `None` past an empty branch.
pub struct RawSummary {
  pub id:       Option<String>,
  pub name:     Option<String>,
  pub code:     Option<String>,
  pub category: Option<String>,
}

impl RawSummary {
  /// Read the three summary columns starting at `at`.
  pub fn from_row(row: &rusqlite::Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      id:       row.get(at)?,
      name:     row.get(at + 1)?,
      code:     row.get(at + 2)?,
      category: None,
    })
  }

  pub fn into_summary(self) -> Result<Option<NodeSummary>> {
    let (Some(id), Some(name)) = (self.id, self.name) else {
      return Ok(None);
    };
    Ok(Some(NodeSummary {
      id: decode_uuid(&id)?,
      name,
      code: self.code,
      category: self.category.as_deref().map(decode_category).transpose()?,
    }))
  }
}
