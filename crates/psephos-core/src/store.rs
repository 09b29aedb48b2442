//! The `ElectionStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `psephos-store-sqlite`).
//! The pipeline, resolver, guard and roll-up entry points in this crate depend
//! on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  fact::{Fact, FactKind},
  hierarchy::{Level, Node},
  rollup::{RollupQuery, RollupRow},
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// A unique constraint rejected a write. `key` is the name of the violated
/// key (`"code"` for nodes, a [`UniqueKey`](crate::schema::UniqueKey) name
/// for facts).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyConflict {
  pub key:         String,
  pub existing_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
  Written,
  Conflict(KeyConflict),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
  Deleted,
  Missing,
  /// Other records still point at the target; nothing was deleted.
  InUse(u64),
}

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`ElectionStore::list_nodes`] and
/// [`ElectionStore::count_nodes`].
#[derive(Debug, Clone)]
pub struct NodeQuery {
  pub level:     Level,
  pub parent_id: Option<Uuid>,
  /// Restrict to these ids. Empty means no restriction.
  pub ids:       Vec<Uuid>,
  /// Case-insensitive substring over name and code.
  pub text:      Option<String>,
  pub limit:     Option<u64>,
  pub offset:    Option<u64>,
}

impl NodeQuery {
  pub fn level(level: Level) -> Self {
    Self {
      level,
      parent_id: None,
      ids: Vec::new(),
      text: None,
      limit: None,
      offset: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumericRange {
  pub field: String,
  pub min:   Option<f64>,
  pub max:   Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
  pub field: String,
  pub from:  Option<NaiveDate>,
  pub to:    Option<NaiveDate>,
}

/// Parameters for [`ElectionStore::list_facts`] and
/// [`ElectionStore::count_facts`]. Field names are checked against the kind's
/// declared fields before a query reaches the store.
#[derive(Debug, Clone, PartialEq)]
pub struct FactQuery {
  pub kind:        FactKind,
  /// Reference field equality filters, e.g. `("booth_id", id)`.
  pub eq:          Vec<(String, Uuid)>,
  /// Case-insensitive substring matched against any of `text_fields`.
  pub text:        Option<String>,
  pub text_fields: Vec<String>,
  pub ranges:      Vec<NumericRange>,
  pub dates:       Vec<DateRange>,
  pub limit:       Option<u64>,
  pub offset:      Option<u64>,
}

impl FactQuery {
  pub fn kind(kind: FactKind) -> Self {
    Self {
      kind,
      eq: Vec::new(),
      text: None,
      text_fields: Vec::new(),
      ranges: Vec::new(),
      dates: Vec::new(),
      limit: None,
      offset: None,
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an election data backend.
///
/// Backends enforce node codes and fact natural keys with unique constraints
/// and report violations as [`WriteOutcome::Conflict`] rather than as errors.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ElectionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Hierarchy ─────────────────────────────────────────────────────────

  /// Retrieve a node by level and id. Returns `None` if there is no node
  /// with that id at that level.
  fn get_node(
    &self,
    level: Level,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Node>, Self::Error>> + Send + '_;

  /// Id of the node at `level` already using `code`, ignoring `exclude`.
  fn find_node_by_code<'a>(
    &'a self,
    level: Level,
    code: &'a str,
    exclude: Option<Uuid>,
  ) -> impl Future<Output = Result<Option<Uuid>, Self::Error>> + Send + 'a;

  fn insert_node<'a>(
    &'a self,
    node: &'a Node,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;

  /// Replace a node. When its parent changed, the backend rewrites the
  /// ancestry of every descendant in the same transaction.
  fn update_node<'a>(
    &'a self,
    node: &'a Node,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;

  /// Delete a node unless children, facts or committees still reference it.
  fn delete_node(
    &self,
    level: Level,
    id: Uuid,
  ) -> impl Future<Output = Result<DeleteOutcome, Self::Error>> + Send + '_;

  /// Nodes matching `query`, in insertion order.
  fn list_nodes<'a>(
    &'a self,
    query: &'a NodeQuery,
  ) -> impl Future<Output = Result<Vec<Node>, Self::Error>> + Send + 'a;

  /// Number of nodes matching `query`, ignoring `limit` and `offset`.
  fn count_nodes<'a>(
    &'a self,
    query: &'a NodeQuery,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  // ── Facts ─────────────────────────────────────────────────────────────

  fn get_fact(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Fact>, Self::Error>> + Send + '_;

  /// Id of the `kind` record holding natural key `key_name = key_value`,
  /// ignoring `exclude`.
  fn find_fact_by_key<'a>(
    &'a self,
    kind: FactKind,
    key_name: &'a str,
    key_value: &'a str,
    exclude: Option<Uuid>,
  ) -> impl Future<Output = Result<Option<Uuid>, Self::Error>> + Send + 'a;

  /// Persist a new fact together with its natural keys and outgoing links.
  fn insert_fact<'a>(
    &'a self,
    fact: &'a Fact,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;

  /// Replace a fact's body, natural keys and links in one transaction.
  fn update_fact<'a>(
    &'a self,
    fact: &'a Fact,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;

  /// Delete a fact unless another fact still links to it.
  fn delete_fact(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<DeleteOutcome, Self::Error>> + Send + '_;

  /// Facts matching `query`, in insertion order.
  fn list_facts<'a>(
    &'a self,
    query: &'a FactQuery,
  ) -> impl Future<Output = Result<Vec<Fact>, Self::Error>> + Send + 'a;

  fn count_facts<'a>(
    &'a self,
    query: &'a FactQuery,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  // ── Roll-up ───────────────────────────────────────────────────────────

  /// The flattened Division→Booth outer join, restricted by the query's
  /// pins and paged by its limit and offset.
  fn rollup<'a>(
    &'a self,
    query: &'a RollupQuery,
  ) -> impl Future<Output = Result<Vec<RollupRow>, Self::Error>> + Send + 'a;

  /// Total number of rows [`Self::rollup`] would produce without paging.
  fn count_rollup<'a>(
    &'a self,
    query: &'a RollupQuery,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;
}
