//! Administration of hierarchy nodes.
//!
//! Ancestry is always derived from the parent. Codes are unique per level.
//! Deletes are restricted: a node that anything still points at stays.

use tracing::info;
use uuid::Uuid;

use crate::{
  Error, Result,
  audit::Audit,
  hierarchy::{Ancestry, Level, Node, NodeInput},
  page::{Page, PageRequest},
  store::{DeleteOutcome, ElectionStore, KeyConflict, NodeQuery, WriteOutcome},
};

const MAX_NAME_LEN: usize = 100;

fn check_name(raw: &str) -> Result<String> {
  let name = raw.trim();
  if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
    return Err(Error::validation(
      "name",
      format!("must be between 1 and {MAX_NAME_LEN} characters"),
    ));
  }
  Ok(name.to_owned())
}

/// Blank codes clear the code.
fn clean_code(raw: &str) -> Option<String> {
  Some(raw.trim().to_owned()).filter(|c| !c.is_empty())
}

fn code_conflict(conflict: KeyConflict) -> Error {
  Error::DuplicateRecord {
    conflicting_fields: vec!["code".to_owned()],
    existing_id:        conflict.existing_id,
  }
}

async fn ensure_code_free<S: ElectionStore>(
  store: &S,
  level: Level,
  code: &str,
  own_id: Option<Uuid>,
) -> Result<()> {
  let taken = store
    .find_node_by_code(level, code, own_id)
    .await
    .map_err(Error::store)?;
  match taken {
    Some(existing_id) => Err(code_conflict(KeyConflict {
      key: "code".to_owned(),
      existing_id,
    })),
    None => Ok(()),
  }
}

/// Work out the parent and ancestry of a node at `level` placed under
/// `parent_id`, checking any ancestor ids the caller claimed.
async fn place<S: ElectionStore>(
  store: &S,
  level: Level,
  parent_id: Option<Uuid>,
  claims: &Ancestry,
) -> Result<(Option<Uuid>, Ancestry)> {
  let Some(parent_level) = level.parent() else {
    if parent_id.is_some() {
      return Err(Error::validation("parent_id", "a state has no parent"));
    }
    Ancestry::default().check_claims(claims)?;
    return Ok((None, Ancestry::default()));
  };

  let parent_id = parent_id.ok_or_else(|| {
    Error::validation("parent_id", format!("a {level} needs a parent {parent_level}"))
  })?;
  let parent = store
    .get_node(parent_level, parent_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::reference_not_found("parent_id"))?;

  let ancestry = Ancestry::child_of(&parent);
  ancestry.check_claims(claims)?;
  Ok((Some(parent.id), ancestry))
}

pub async fn create_node<S: ElectionStore>(
  store: &S,
  level: Level,
  input: NodeInput,
  caller: Uuid,
) -> Result<Node> {
  let name = check_name(input.name.as_deref().unwrap_or_default())?;
  let code = input.code.as_deref().and_then(clean_code);
  let details = input.apply_details(level, None)?;
  let (parent_id, ancestry) = place(store, level, input.parent_id, &input.claims()).await?;
  if let Some(code) = &code {
    ensure_code_free(store, level, code, None).await?;
  }

  let node = Node {
    id: Uuid::new_v4(),
    name,
    code,
    parent_id,
    ancestry,
    details,
    audit: Audit::new(caller),
  };
  if let WriteOutcome::Conflict(conflict) = store.insert_node(&node).await.map_err(Error::store)? {
    return Err(code_conflict(conflict));
  }
  info!(%level, id = %node.id, %caller, "node created");
  Ok(node)
}

/// Patch a node. Moving it under a new parent rewrites its ancestry, and the
/// store carries the change down to every descendant.
pub async fn update_node<S: ElectionStore>(
  store: &S,
  level: Level,
  id: Uuid,
  input: NodeInput,
  caller: Uuid,
) -> Result<Node> {
  let mut node = get_node(store, level, id).await?;

  if let Some(name) = &input.name {
    node.name = check_name(name)?;
  }
  if let Some(code) = &input.code {
    node.code = clean_code(code);
  }
  node.details = input.apply_details(level, Some(&node.details))?;

  let claims = input.claims();
  match input.parent_id {
    Some(parent_id) if node.parent_id != Some(parent_id) => {
      let (parent_id, ancestry) = place(store, level, Some(parent_id), &claims).await?;
      info!(%level, %id, from = ?node.parent_id, to = ?parent_id, "node re-parented");
      node.parent_id = parent_id;
      node.ancestry = ancestry;
    }
    _ => node.ancestry.check_claims(&claims)?,
  }

  if let Some(code) = &node.code {
    ensure_code_free(store, level, code, Some(id)).await?;
  }

  node.audit.touch(caller);
  if let WriteOutcome::Conflict(conflict) = store.update_node(&node).await.map_err(Error::store)? {
    return Err(code_conflict(conflict));
  }
  info!(%level, %id, %caller, "node updated");
  Ok(node)
}

pub async fn get_node<S: ElectionStore>(store: &S, level: Level, id: Uuid) -> Result<Node> {
  store
    .get_node(level, id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::node_not_found(level, id))
}

#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
  pub parent_id: Option<Uuid>,
  pub text:      Option<String>,
}

pub async fn list_nodes<S: ElectionStore>(
  store: &S,
  level: Level,
  filter: NodeFilter,
  page: PageRequest,
) -> Result<Page<Node>> {
  let mut query = NodeQuery {
    parent_id: filter.parent_id,
    text: filter.text.map(|t| t.trim().to_owned()).filter(|t| !t.is_empty()),
    ..NodeQuery::level(level)
  };
  let total = store.count_nodes(&query).await.map_err(Error::store)?;
  query.limit = Some(page.limit());
  query.offset = Some(page.offset());
  let nodes = store.list_nodes(&query).await.map_err(Error::store)?;
  Ok(Page::new(page, total, nodes))
}

pub async fn delete_node<S: ElectionStore>(store: &S, level: Level, id: Uuid) -> Result<()> {
  match store.delete_node(level, id).await.map_err(Error::store)? {
    DeleteOutcome::Deleted => {
      info!(%level, %id, "node deleted");
      Ok(())
    }
    DeleteOutcome::Missing => Err(Error::node_not_found(level, id)),
    DeleteOutcome::InUse(dependents) => Err(Error::NodeInUse { level, id, dependents }),
  }
}
