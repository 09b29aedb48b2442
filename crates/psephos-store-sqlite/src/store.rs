//! [`SqliteStore`], the SQLite implementation of [`ElectionStore`].

use std::path::Path;

use psephos_core::{
  fact::{Fact, FactKind},
  hierarchy::{Level, Node},
  rollup::{RollupQuery, RollupRow},
  store::{
    DeleteOutcome, ElectionStore, FactQuery, KeyConflict, NodeQuery, WriteOutcome,
  },
};
use rusqlite::{OptionalExtension as _, types::Value};
use tracing::debug;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    FACT_COLUMNS, NODE_COLUMNS, RawFact, RawNode, RawSummary, decode_uuid, encode_uuid,
    limit_offset,
  },
  rollup::{self, CATEGORY_COLUMN},
  schema::SCHEMA,
};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

/// `WHERE` clause and parameters for a node query.
fn node_filter(query: &NodeQuery) -> (String, Vec<Value>) {
  let mut conds = vec!["level = ?".to_owned()];
  let mut params = vec![Value::Text(query.level.as_str().to_owned())];

  if let Some(parent_id) = query.parent_id {
    conds.push("parent_id = ?".to_owned());
    params.push(Value::Text(encode_uuid(parent_id)));
  }
  if !query.ids.is_empty() {
    let marks = vec!["?"; query.ids.len()].join(", ");
    conds.push(format!("node_id IN ({marks})"));
    params.extend(query.ids.iter().map(|id| Value::Text(encode_uuid(*id))));
  }
  if let Some(text) = &query.text {
    conds.push(
      "(instr(lower(name), lower(?)) > 0 OR instr(lower(coalesce(code, '')), lower(?)) > 0)"
        .to_owned(),
    );
    params.push(Value::Text(text.clone()));
    params.push(Value::Text(text.clone()));
  }
  (format!("WHERE {}", conds.join(" AND ")), params)
}

/// `WHERE` clause and parameters for a fact query. Field names are bound as
/// JSON paths, never spliced into the statement.
fn fact_filter(query: &FactQuery) -> (String, Vec<Value>) {
  let path = |field: &str| Value::Text(format!("$.{field}"));
  let mut conds = vec!["f.kind = ?".to_owned()];
  let mut params = vec![Value::Text(query.kind.as_str().to_owned())];

  for (field, id) in &query.eq {
    conds.push(
      "EXISTS (SELECT 1 FROM fact_links l \
       WHERE l.fact_id = f.fact_id AND l.field = ? AND l.target_id = ?)"
        .to_owned(),
    );
    params.push(Value::Text(field.clone()));
    params.push(Value::Text(encode_uuid(*id)));
  }

  if let Some(text) = &query.text
    && !query.text_fields.is_empty()
  {
    let any = query
      .text_fields
      .iter()
      .map(|_| "instr(lower(coalesce(json_extract(f.body, ?), '')), lower(?)) > 0")
      .collect::<Vec<_>>()
      .join(" OR ");
    conds.push(format!("({any})"));
    for field in &query.text_fields {
      params.push(path(field));
      params.push(Value::Text(text.clone()));
    }
  }

  for range in &query.ranges {
    if let Some(min) = range.min {
      conds.push("CAST(json_extract(f.body, ?) AS REAL) >= ?".to_owned());
      params.push(path(&range.field));
      params.push(Value::Real(min));
    }
    if let Some(max) = range.max {
      conds.push("CAST(json_extract(f.body, ?) AS REAL) <= ?".to_owned());
      params.push(path(&range.field));
      params.push(Value::Real(max));
    }
  }

  // ISO dates compare correctly as text.
  for range in &query.dates {
    if let Some(from) = range.from {
      conds.push("json_extract(f.body, ?) >= ?".to_owned());
      params.push(path(&range.field));
      params.push(Value::Text(from.to_string()));
    }
    if let Some(to) = range.to {
      conds.push("json_extract(f.body, ?) <= ?".to_owned());
      params.push(path(&range.field));
      params.push(Value::Text(to.to_string()));
    }
  }

  (format!("WHERE {}", conds.join(" AND ")), params)
}

/// Rows from `fact_keys` and `fact_links` for a fact, encoded for binding.
struct SideRows {
  keys:  Vec<(String, String)>,
  links: Vec<(String, String)>,
}

impl SideRows {
  fn of(fact: &Fact) -> Self {
    Self {
      keys:  fact
        .value
        .unique_keys()
        .into_iter()
        .map(|k| (k.name.to_owned(), k.value))
        .collect(),
      links: fact
        .value
        .links()
        .into_iter()
        .map(|(field, id)| (field.to_owned(), encode_uuid(id)))
        .collect(),
    }
  }

  /// Insert the side rows. A unique violation is reported as a conflict
  /// with the record already holding the key.
  fn insert(
    &self,
    tx: &rusqlite::Transaction<'_>,
    fact_id: &str,
    kind: &str,
  ) -> rusqlite::Result<Option<(String, String)>> {
    for (name, value) in &self.keys {
      let inserted = tx.execute(
        "INSERT INTO fact_keys (fact_id, kind, key_name, key_value) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![fact_id, kind, name, value],
      );
      match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
          let existing: String = tx.query_row(
            "SELECT fact_id FROM fact_keys WHERE kind = ?1 AND key_name = ?2 AND key_value = ?3",
            rusqlite::params![kind, name, value],
            |r| r.get(0),
          )?;
          return Ok(Some((name.clone(), existing)));
        }
        Err(e) => return Err(e),
      }
    }
    for (field, target) in &self.links {
      tx.execute(
        "INSERT INTO fact_links (fact_id, field, target_id) VALUES (?1, ?2, ?3)",
        rusqlite::params![fact_id, field, target],
      )?;
    }
    Ok(None)
  }
}

fn conflict(key: String, existing_id: &str) -> Result<WriteOutcome> {
  Ok(WriteOutcome::Conflict(KeyConflict {
    key,
    existing_id: decode_uuid(existing_id)?,
  }))
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An election store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
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

  /// Open an in-memory store, useful for testing.
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

  /// Number of distinct facts linking to `target`.
  fn count_inbound(conn: &rusqlite::Connection, target: &str) -> rusqlite::Result<u64> {
    conn.query_row(
      "SELECT COUNT(DISTINCT fact_id) FROM fact_links WHERE target_id = ?1",
      rusqlite::params![target],
      |r| r.get::<_, i64>(0),
    )
    .map(|n| n as u64)
  }
}

// ─── ElectionStore impl ──────────────────────────────────────────────────────

impl ElectionStore for SqliteStore {
  type Error = Error;

  // ── Hierarchy ─────────────────────────────────────────────────────────────

  async fn get_node(&self, level: Level, id: Uuid) -> Result<Option<Node>> {
    let id_str = encode_uuid(id);
    let level_str = level.as_str();

    let raw: Option<RawNode> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {NODE_COLUMNS} FROM nodes WHERE node_id = ?1 AND level = ?2"),
              rusqlite::params![id_str, level_str],
              RawNode::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawNode::into_node).transpose()
  }

  async fn find_node_by_code(
    &self,
    level: Level,
    code: &str,
    exclude: Option<Uuid>,
  ) -> Result<Option<Uuid>> {
    let code = code.to_owned();
    let level_str = level.as_str();
    let exclude_str = exclude.map(encode_uuid);

    let found: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT node_id FROM nodes
               WHERE level = ?1 AND code = ?2 AND (?3 IS NULL OR node_id != ?3)",
              rusqlite::params![level_str, code, exclude_str],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    found.as_deref().map(decode_uuid).transpose()
  }

  async fn insert_node(&self, node: &Node) -> Result<WriteOutcome> {
    let raw = RawNode::encode(node)?;

    let taken: Option<String> = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          &format!(
            "INSERT INTO nodes ({NODE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
          ),
          rusqlite::params![
            raw.node_id,
            raw.level,
            raw.name,
            raw.code,
            raw.parent_id,
            raw.state_id,
            raw.division_id,
            raw.parliament_id,
            raw.assembly_id,
            raw.block_id,
            raw.details,
            raw.audit.created_by,
            raw.audit.updated_by,
            raw.audit.created_at,
            raw.audit.updated_at,
          ],
        );
        match inserted {
          Ok(_) => Ok(None),
          Err(e) if is_unique_violation(&e) => Ok(
            conn
              .query_row(
                "SELECT node_id FROM nodes WHERE level = ?1 AND code = ?2",
                rusqlite::params![raw.level, raw.code],
                |r| r.get(0),
              )
              .optional()?,
          ),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    match taken {
      None => Ok(WriteOutcome::Written),
      Some(existing) => conflict("code".to_owned(), &existing),
    }
  }

  async fn update_node(&self, node: &Node) -> Result<WriteOutcome> {
    let raw = RawNode::encode(node)?;
    let level = node.level();
    // Descendants share this node's ancestry above its own level. Booths
    // have no descendants and no `booth_id` column.
    let cascade: Vec<(&'static str, Option<String>)> = match level.child() {
      Some(_) => level
        .ancestors()
        .iter()
        .map(|l| (l.id_field(), node.ancestry.get(*l).map(encode_uuid)))
        .collect(),
      None => Vec::new(),
    };

    let outcome: std::result::Result<usize, Option<String>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let updated = tx.execute(
          "UPDATE nodes SET
             name = ?2, code = ?3, parent_id = ?4, state_id = ?5, division_id = ?6,
             parliament_id = ?7, assembly_id = ?8, block_id = ?9, details = ?10,
             updated_by = ?11, updated_at = ?12
           WHERE node_id = ?1",
          rusqlite::params![
            raw.node_id,
            raw.name,
            raw.code,
            raw.parent_id,
            raw.state_id,
            raw.division_id,
            raw.parliament_id,
            raw.assembly_id,
            raw.block_id,
            raw.details,
            raw.audit.updated_by,
            raw.audit.updated_at,
          ],
        );
        match updated {
          Ok(_) => {}
          Err(e) if is_unique_violation(&e) => {
            let existing = tx
              .query_row(
                "SELECT node_id FROM nodes WHERE level = ?1 AND code = ?2 AND node_id != ?3",
                rusqlite::params![raw.level, raw.code, raw.node_id],
                |r| r.get(0),
              )
              .optional()?;
            return Ok(Err(existing));
          }
          Err(e) => return Err(e.into()),
        }

        let mut moved = 0;
        if !cascade.is_empty() {
          let sets = cascade
            .iter()
            .enumerate()
            .map(|(i, (col, _))| format!("{col} = ?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
          let mut params: Vec<Value> = vec![Value::Text(raw.node_id.clone())];
          params.extend(cascade.into_iter().map(|(_, id)| id.map_or(Value::Null, Value::Text)));
          moved = tx.execute(
            &format!("UPDATE nodes SET {sets} WHERE {} = ?1", level.id_field()),
            rusqlite::params_from_iter(params),
          )?;
        }
        tx.commit()?;
        Ok(Ok(moved))
      })
      .await?;

    match outcome {
      Ok(moved) => {
        if moved > 0 {
          debug!(%level, id = %node.id, descendants = moved, "ancestry cascaded");
        }
        Ok(WriteOutcome::Written)
      }
      Err(Some(existing)) => conflict("code".to_owned(), &existing),
      Err(None) => Err(Error::Corrupt(format!("unique violation on node {}", node.id))),
    }
  }

  async fn delete_node(&self, level: Level, id: Uuid) -> Result<DeleteOutcome> {
    let id_str = encode_uuid(id);
    let level_str = level.as_str();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let exists = tx
          .query_row(
            "SELECT 1 FROM nodes WHERE node_id = ?1 AND level = ?2",
            rusqlite::params![id_str, level_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !exists {
          return Ok(DeleteOutcome::Missing);
        }

        let children: i64 = tx.query_row(
          "SELECT COUNT(*) FROM nodes WHERE parent_id = ?1",
          rusqlite::params![id_str],
          |r| r.get(0),
        )?;
        let dependents = children as u64 + Self::count_inbound(&tx, &id_str)?;
        if dependents > 0 {
          return Ok(DeleteOutcome::InUse(dependents));
        }

        tx.execute("DELETE FROM nodes WHERE node_id = ?1", rusqlite::params![id_str])?;
        tx.commit()?;
        Ok(DeleteOutcome::Deleted)
      })
      .await?;
    Ok(outcome)
  }

  async fn list_nodes(&self, query: &NodeQuery) -> Result<Vec<Node>> {
    let (where_clause, mut params) = node_filter(query);
    params.extend(limit_offset(query.limit, query.offset));

    let raws: Vec<RawNode> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {NODE_COLUMNS} FROM nodes {where_clause} ORDER BY rowid LIMIT ? OFFSET ?"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawNode::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawNode::into_node).collect()
  }

  async fn count_nodes(&self, query: &NodeQuery) -> Result<u64> {
    let (where_clause, params) = node_filter(query);

    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!("SELECT COUNT(*) FROM nodes {where_clause}"),
          rusqlite::params_from_iter(params),
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(n as u64)
  }

  // ── Facts ─────────────────────────────────────────────────────────────────

  async fn get_fact(&self, id: Uuid) -> Result<Option<Fact>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawFact> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {FACT_COLUMNS} FROM facts f WHERE f.fact_id = ?1"),
              rusqlite::params![id_str],
              RawFact::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawFact::into_fact).transpose()
  }

  async fn find_fact_by_key(
    &self,
    kind: FactKind,
    key_name: &str,
    key_value: &str,
    exclude: Option<Uuid>,
  ) -> Result<Option<Uuid>> {
    let kind_str = kind.as_str();
    let key_name = key_name.to_owned();
    let key_value = key_value.to_owned();
    let exclude_str = exclude.map(encode_uuid);

    let found: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT fact_id FROM fact_keys
               WHERE kind = ?1 AND key_name = ?2 AND key_value = ?3
                 AND (?4 IS NULL OR fact_id != ?4)",
              rusqlite::params![kind_str, key_name, key_value, exclude_str],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    found.as_deref().map(decode_uuid).transpose()
  }

  async fn insert_fact(&self, fact: &Fact) -> Result<WriteOutcome> {
    let raw = RawFact::encode(fact)?;
    let side = SideRows::of(fact);

    let taken = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO facts (fact_id, kind, body, created_by, updated_by, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            raw.fact_id,
            raw.kind,
            raw.body,
            raw.audit.created_by,
            raw.audit.updated_by,
            raw.audit.created_at,
            raw.audit.updated_at,
          ],
        )?;
        // On conflict the transaction is dropped and rolls back.
        if let Some(taken) = side.insert(&tx, &raw.fact_id, &raw.kind)? {
          return Ok(Some(taken));
        }
        tx.commit()?;
        Ok(None)
      })
      .await?;

    match taken {
      None => Ok(WriteOutcome::Written),
      Some((key, existing)) => conflict(key, &existing),
    }
  }

  async fn update_fact(&self, fact: &Fact) -> Result<WriteOutcome> {
    let raw = RawFact::encode(fact)?;
    let side = SideRows::of(fact);

    let taken = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "UPDATE facts SET body = ?2, updated_by = ?3, updated_at = ?4 WHERE fact_id = ?1",
          rusqlite::params![raw.fact_id, raw.body, raw.audit.updated_by, raw.audit.updated_at],
        )?;
        tx.execute("DELETE FROM fact_keys WHERE fact_id = ?1", rusqlite::params![raw.fact_id])?;
        tx.execute("DELETE FROM fact_links WHERE fact_id = ?1", rusqlite::params![raw.fact_id])?;
        if let Some(taken) = side.insert(&tx, &raw.fact_id, &raw.kind)? {
          return Ok(Some(taken));
        }
        tx.commit()?;
        Ok(None)
      })
      .await?;

    match taken {
      None => Ok(WriteOutcome::Written),
      Some((key, existing)) => conflict(key, &existing),
    }
  }

  async fn delete_fact(&self, id: Uuid) -> Result<DeleteOutcome> {
    let id_str = encode_uuid(id);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let inbound = Self::count_inbound(&tx, &id_str)?;
        if inbound > 0 {
          return Ok(DeleteOutcome::InUse(inbound));
        }
        let deleted = tx.execute("DELETE FROM facts WHERE fact_id = ?1", rusqlite::params![id_str])?;
        tx.commit()?;
        Ok(if deleted == 0 { DeleteOutcome::Missing } else { DeleteOutcome::Deleted })
      })
      .await?;
    Ok(outcome)
  }

  async fn list_facts(&self, query: &FactQuery) -> Result<Vec<Fact>> {
    let (where_clause, mut params) = fact_filter(query);
    params.extend(limit_offset(query.limit, query.offset));

    let raws: Vec<RawFact> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {FACT_COLUMNS} FROM facts f {where_clause} ORDER BY f.rowid LIMIT ? OFFSET ?"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawFact::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFact::into_fact).collect()
  }

  async fn count_facts(&self, query: &FactQuery) -> Result<u64> {
    let (where_clause, params) = fact_filter(query);

    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!("SELECT COUNT(*) FROM facts f {where_clause}"),
          rusqlite::params_from_iter(params),
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(n as u64)
  }

  // ── Roll-up ───────────────────────────────────────────────────────────────

  async fn rollup(&self, query: &RollupQuery) -> Result<Vec<RollupRow>> {
    let (sql, params) = rollup::rows_sql(query);

    let raws: Vec<[RawSummary; 5]> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |row| {
            let mut assembly = RawSummary::from_row(row, 6)?;
            assembly.category = row.get(CATEGORY_COLUMN)?;
            Ok([
              RawSummary::from_row(row, 0)?,
              RawSummary::from_row(row, 3)?,
              assembly,
              RawSummary::from_row(row, 9)?,
              RawSummary::from_row(row, 12)?,
            ])
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|[division, parliament, assembly, block, booth]| {
        let division = division
          .into_summary()?
          .ok_or_else(|| Error::Corrupt("roll-up row without a division".to_owned()))?;
        Ok(RollupRow {
          division,
          parliament: parliament.into_summary()?,
          assembly: assembly.into_summary()?,
          block: block.into_summary()?,
          booth: booth.into_summary()?,
        })
      })
      .collect()
  }

  async fn count_rollup(&self, query: &RollupQuery) -> Result<u64> {
    let (sql, params) = rollup::count_sql(query);

    let n: i64 = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, rusqlite::params_from_iter(params), |r| r.get(0))?))
      .await?;
    Ok(n as u64)
  }
}
