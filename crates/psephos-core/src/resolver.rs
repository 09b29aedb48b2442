//! Reference resolution: every declared foreign key present on a write is
//! looked up concurrently, and the first miss aborts the write.

use futures::future::try_join_all;
use tracing::debug;
use uuid::Uuid;

use crate::{
  Error, Result,
  fact::{Fact, FactValue},
  hierarchy::Node,
  schema::{BulkRef, FieldRef, Target},
  store::{ElectionStore, NodeQuery},
};

/// The entity a reference resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
  Node(Node),
  Fact(Fact),
}

impl Resolved {
  pub fn id(&self) -> Uuid {
    match self {
      Self::Node(node) => node.id,
      Self::Fact(fact) => fact.fact_id,
    }
  }

  pub fn label(&self) -> String {
    match self {
      Self::Node(node) => node.name.clone(),
      Self::Fact(fact) => fact.value.label(),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRef {
  pub field:  &'static str,
  pub entity: Resolved,
}

/// Look up a single reference. `Ok(None)` when it does not resolve.
pub async fn lookup<S: ElectionStore>(store: &S, r: FieldRef) -> Result<Option<ResolvedRef>> {
  let entity = match r.target {
    Target::Node(level) => store
      .get_node(level, r.id)
      .await
      .map_err(Error::store)?
      .map(Resolved::Node),
    // A fact of the wrong kind is as good as missing.
    Target::Fact(kind) => store
      .get_fact(r.id)
      .await
      .map_err(Error::store)?
      .filter(|f| f.kind() == kind)
      .map(Resolved::Fact),
  };
  Ok(entity.map(|entity| ResolvedRef { field: r.field, entity }))
}

async fn resolve_one<S: ElectionStore>(store: &S, r: FieldRef) -> Result<ResolvedRef> {
  lookup(store, r).await?.ok_or_else(|| {
    debug!(field = r.field, id = %r.id, "reference did not resolve");
    Error::reference_not_found(r.field)
  })
}

/// Resolve `refs` concurrently. The first unresolved field fails the whole
/// call and the outstanding lookups are dropped.
pub async fn resolve<S: ElectionStore>(store: &S, refs: &[FieldRef]) -> Result<Vec<ResolvedRef>> {
  try_join_all(refs.iter().map(|r| resolve_one(store, *r))).await
}

/// Require every id of a list-valued reference to exist at its level.
/// Repeated ids are counted once; an empty list is left to the business
/// rules.
pub async fn verify_bulk<S: ElectionStore>(store: &S, bulk: &BulkRef) -> Result<()> {
  let mut distinct = Vec::with_capacity(bulk.ids.len());
  for id in &bulk.ids {
    if !distinct.contains(id) {
      distinct.push(*id);
    }
  }
  if distinct.is_empty() {
    return Ok(());
  }

  let query = NodeQuery {
    ids: distinct,
    ..NodeQuery::level(bulk.level)
  };
  let found = store.count_nodes(&query).await.map_err(Error::store)?;
  if found != query.ids.len() as u64 {
    debug!(
      field = bulk.field,
      level = %bulk.level,
      expected = query.ids.len(),
      found,
      "bulk reference count mismatch"
    );
    return Err(Error::reference_not_found(bulk.field));
  }
  Ok(())
}

/// Check that every hierarchy reference above the value's deepest one names
/// that node's ancestor at the same level.
///
/// The deepest node is taken from `resolved` when this write resolved it and
/// fetched otherwise (an update that did not touch it).
pub async fn check_chain<S: ElectionStore>(
  store: &S,
  value: &FactValue,
  resolved: &[ResolvedRef],
) -> Result<()> {
  let refs = value.hierarchy_refs();
  if refs.len() < 2 {
    return Ok(());
  }
  let Some(&(deep_field, deep_level, deep_id)) = refs.iter().max_by_key(|(_, level, _)| *level)
  else {
    return Ok(());
  };

  let cached = resolved.iter().find_map(|r| match &r.entity {
    Resolved::Node(node) if node.id == deep_id && node.level() == deep_level => Some(node.clone()),
    _ => None,
  });
  let deepest = match cached {
    Some(node) => node,
    None => store
      .get_node(deep_level, deep_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::reference_not_found(deep_field))?,
  };

  for (field, level, id) in refs {
    if level == deep_level {
      continue;
    }
    if deepest.ancestry.get(level) != Some(id) {
      debug!(field, %id, deepest = %deepest.id, "hierarchy reference outside chain");
      return Err(Error::validation(
        field,
        format!("is not the {level} containing {deep_field} {deep_id}"),
      ));
    }
  }
  Ok(())
}
