//! SQL for the hierarchy roll-up.
//!
//! The join starts at the deepest pinned level (Division when nothing below
//! State is pinned). Levels above the root are inner-joined through the
//! root's ancestry columns, levels below it are left-joined parent to child,
//! and every pin becomes a predicate on the root row. The statement is
//! therefore the unfiltered roll-up restricted to the pinned ids without
//! ever expanding branches outside them.

use psephos_core::{hierarchy::Level, rollup::RollupQuery};
use rusqlite::types::Value;

use crate::encode::{encode_uuid, limit_offset};

/// The levels a roll-up row carries, in nesting order.
const ROW_LEVELS: [Level; 5] =
  [Level::Division, Level::Parliament, Level::Assembly, Level::Block, Level::Booth];

fn alias(level: Level) -> &'static str {
  match level {
    Level::State => "s",
    Level::Division => "d",
    Level::Parliament => "p",
    Level::Assembly => "a",
    Level::Block => "b",
    Level::Booth => "t",
  }
}

/// Column list matching [`crate::encode::RawSummary::from_row`], three
/// columns per level, followed by the assembly category.
fn select_list() -> String {
  let mut cols: Vec<String> = ROW_LEVELS
    .iter()
    .map(|&l| {
      let x = alias(l);
      format!("{x}.node_id, {x}.name, {x}.code")
    })
    .collect();
  cols.push("json_extract(a.details, '$.category')".to_owned());
  cols.join(", ")
}

/// Index of the category column in [`select_list`].
pub const CATEGORY_COLUMN: usize = ROW_LEVELS.len() * 3;

/// `FROM … WHERE …` shared by the row and count statements, with its
/// parameters in placeholder order.
fn from_where(query: &RollupQuery) -> (String, Vec<Value>) {
  let root = query
    .pins
    .iter()
    .map(|(level, _)| *level)
    .max()
    .filter(|level| *level > Level::State)
    .unwrap_or(Level::Division);
  let r = alias(root);

  let mut sql = format!("FROM nodes {r}");
  for &level in ROW_LEVELS.iter().filter(|l| **l < root) {
    let x = alias(level);
    sql.push_str(&format!(
      "\nJOIN nodes {x} ON {x}.node_id = {r}.{}",
      level.id_field()
    ));
  }
  let mut parent = r;
  for &level in ROW_LEVELS.iter().filter(|l| **l > root) {
    let x = alias(level);
    sql.push_str(&format!(
      "\nLEFT JOIN nodes {x} ON {x}.level = '{}' AND {x}.parent_id = {parent}.node_id",
      level.as_str()
    ));
    parent = x;
  }

  let mut params = vec![Value::Text(root.as_str().to_owned())];
  sql.push_str(&format!("\nWHERE {r}.level = ?"));
  for &(level, id) in &query.pins {
    let column = if level == root { "node_id" } else { level.id_field() };
    sql.push_str(&format!(" AND {r}.{column} = ?"));
    params.push(Value::Text(encode_uuid(id)));
  }
  (sql, params)
}

/// The paged row statement.
pub fn rows_sql(query: &RollupQuery) -> (String, Vec<Value>) {
  let (from_where, mut params) = from_where(query);
  let order = ROW_LEVELS
    .iter()
    .map(|&l| format!("{}.rowid", alias(l)))
    .collect::<Vec<_>>()
    .join(", ");
  let sql = format!(
    "SELECT {}\n{from_where}\nORDER BY {order}\nLIMIT ? OFFSET ?",
    select_list()
  );
  params.extend(limit_offset(query.limit, query.offset));
  (sql, params)
}

pub fn count_sql(query: &RollupQuery) -> (String, Vec<Value>) {
  let (from_where, params) = from_where(query);
  (format!("SELECT COUNT(*)\n{from_where}"), params)
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;

  #[test]
  fn unpinned_rollup_starts_at_division() {
    let (sql, params) = count_sql(&RollupQuery::default());
    assert!(sql.contains("FROM nodes d\n"));
    assert!(sql.contains("LEFT JOIN nodes t ON t.level = 'booth' AND t.parent_id = b.node_id"));
    assert_eq!(params.len(), 1);
  }

  #[test]
  fn deepest_pin_becomes_the_root() {
    let query = RollupQuery {
      pins: vec![(Level::Division, Uuid::new_v4()), (Level::Assembly, Uuid::new_v4())],
      ..Default::default()
    };
    let (sql, params) = count_sql(&query);
    assert!(sql.contains("FROM nodes a\n"));
    assert!(sql.contains("JOIN nodes d ON d.node_id = a.division_id"));
    assert!(sql.contains("AND a.division_id = ?"));
    assert!(sql.contains("AND a.node_id = ?"));
    assert!(!sql.contains("LEFT JOIN nodes p"));
    assert_eq!(params.len(), 3);
  }

  #[test]
  fn state_pin_filters_divisions() {
    let query = RollupQuery {
      pins: vec![(Level::State, Uuid::new_v4())],
      ..Default::default()
    };
    let (sql, _) = count_sql(&query);
    assert!(sql.contains("FROM nodes d\n"));
    assert!(sql.contains("AND d.state_id = ?"));
  }
}
