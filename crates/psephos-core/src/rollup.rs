//! Flattened Division→Parliament→Assembly→Block→Booth roll-ups.
//!
//! Each hop is an outer join: a node without children still produces one row
//! with nothing below it. Rows come out in nesting order, every level in
//! store insertion order, and pagination applies to the flattened stream.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{
  Error, Result,
  hierarchy::{AssemblyCategory, Level},
  page::{Page, PageRequest},
  store::ElectionStore,
};

/// The projection of a node inside a roll-up row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSummary {
  pub id:       Uuid,
  pub name:     String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub code:     Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category: Option<AssemblyCategory>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupRow {
  pub division:   NodeSummary,
  pub parliament: Option<NodeSummary>,
  pub assembly:   Option<NodeSummary>,
  pub block:      Option<NodeSummary>,
  pub booth:      Option<NodeSummary>,
}

impl RollupRow {
  /// The summary at `level`. Rows carry no state column.
  pub fn at(&self, level: Level) -> Option<&NodeSummary> {
    match level {
      Level::State => None,
      Level::Division => Some(&self.division),
      Level::Parliament => self.parliament.as_ref(),
      Level::Assembly => self.assembly.as_ref(),
      Level::Block => self.block.as_ref(),
      Level::Booth => self.booth.as_ref(),
    }
  }
}

/// Levels pinned to a single id. Every pin restricts the join stage of its
/// level, and pins combine with AND.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct RollupFilter {
  pub state:      Option<Uuid>,
  pub division:   Option<Uuid>,
  pub parliament: Option<Uuid>,
  pub assembly:   Option<Uuid>,
  pub block:      Option<Uuid>,
  pub booth:      Option<Uuid>,
}

impl RollupFilter {
  pub fn pin(level: Level, id: Uuid) -> Self { Self::default().with(level, id) }

  /// Add or replace the pin at `level`.
  pub fn with(mut self, level: Level, id: Uuid) -> Self {
    *self.slot(level) = Some(id);
    self
  }

  fn slot(&mut self, level: Level) -> &mut Option<Uuid> {
    match level {
      Level::State => &mut self.state,
      Level::Division => &mut self.division,
      Level::Parliament => &mut self.parliament,
      Level::Assembly => &mut self.assembly,
      Level::Block => &mut self.block,
      Level::Booth => &mut self.booth,
    }
  }

  /// Set pins, root first.
  pub fn pins(&self) -> Vec<(Level, Uuid)> {
    [
      (Level::State, self.state),
      (Level::Division, self.division),
      (Level::Parliament, self.parliament),
      (Level::Assembly, self.assembly),
      (Level::Block, self.block),
      (Level::Booth, self.booth),
    ]
    .into_iter()
    .filter_map(|(level, id)| Some((level, id?)))
    .collect()
  }
}

/// What a backend needs to run a roll-up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollupQuery {
  pub pins:   Vec<(Level, Uuid)>,
  pub limit:  Option<u64>,
  pub offset: Option<u64>,
}

/// One page of the roll-up restricted by `filter`.
pub async fn rollup<S: ElectionStore>(
  store: &S,
  filter: RollupFilter,
  page: PageRequest,
) -> Result<Page<RollupRow>> {
  let mut query = RollupQuery {
    pins: filter.pins(),
    ..Default::default()
  };
  let total = store.count_rollup(&query).await.map_err(Error::store)?;
  query.limit = Some(page.limit());
  query.offset = Some(page.offset());
  let rows = store.rollup(&query).await.map_err(Error::store)?;
  debug!(pins = ?query.pins, total, returned = rows.len(), "rollup");
  Ok(Page::new(page, total, rows))
}

/// One page of the roll-up below a single node. `raw_id` is taken verbatim
/// so that an unparsable id reports as a missing node.
pub async fn rollup_from<S: ElectionStore>(
  store: &S,
  level: Level,
  raw_id: &str,
  page: PageRequest,
) -> Result<Page<RollupRow>> {
  let not_found = || Error::node_not_found(level, raw_id);
  let id = Uuid::parse_str(raw_id.trim()).map_err(|_| not_found())?;
  store
    .get_node(level, id)
    .await
    .map_err(Error::store)?
    .ok_or_else(not_found)?;
  rollup(store, RollupFilter::pin(level, id), page).await
}
