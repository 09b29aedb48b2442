//! The fact write pipeline and the fact read operations.
//!
//! Every kind goes through the same steps: decode, resolve references, check
//! the hierarchy chain, apply business rules, run the uniqueness guard, stamp
//! and persist. A failure before the last step leaves the store untouched.

use futures::future::try_join_all;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  Error, Result,
  audit::Audit,
  fact::{Fact, FactKind, FactValue},
  guard,
  page::{Page, PageRequest},
  resolver::{self, Resolved, ResolvedRef},
  schema::FieldRef,
  store::{DateRange, DeleteOutcome, ElectionStore, FactQuery, NumericRange, WriteOutcome},
};

// ─── Views ───────────────────────────────────────────────────────────────────

/// Display form of one singular reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefLabel {
  pub field: String,
  pub id:    Uuid,
  pub label: String,
}

/// A fact as returned to callers: the record plus a label for each singular
/// reference it holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactView {
  pub id:         Uuid,
  #[serde(flatten)]
  pub value:      FactValue,
  #[serde(flatten)]
  pub audit:      Audit,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub references: Vec<RefLabel>,
}

impl FactView {
  fn bare(fact: Fact) -> Self {
    Self {
      id:         fact.fact_id,
      value:      fact.value,
      audit:      fact.audit,
      references: Vec::new(),
    }
  }
}

/// Build a view, reusing references resolved during the write and looking
/// up the rest.
async fn describe<S: ElectionStore>(
  store: &S,
  fact: Fact,
  known: Vec<ResolvedRef>,
) -> Result<FactView> {
  let references = fact.value.references();
  let is_known =
    |f: &FieldRef| known.iter().any(|k| k.field == f.field && k.entity.id() == f.id);
  let lookups = references
    .iter()
    .filter(|f| !is_known(*f))
    .map(|f| resolver::lookup(store, *f));
  let fetched = try_join_all(lookups).await?;
  let resolved: Vec<ResolvedRef> = known.into_iter().chain(fetched.into_iter().flatten()).collect();

  let labels = references
    .iter()
    .filter_map(|f| {
      let r = resolved.iter().find(|r| r.field == f.field && r.entity.id() == f.id)?;
      Some(RefLabel {
        field: f.field.to_owned(),
        id:    f.id,
        label: r.entity.label(),
      })
    })
    .collect();

  let mut view = FactView::bare(fact);
  view.references = labels;
  Ok(view)
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn decode(kind: FactKind, data: Value) -> Result<FactValue> {
  FactValue::from_parts(kind, data).map_err(|e| Error::validation("data", e.to_string()))
}

async fn fetch<S: ElectionStore>(store: &S, kind: FactKind, id: Uuid) -> Result<Fact> {
  store
    .get_fact(id)
    .await
    .map_err(Error::store)?
    .filter(|f| f.kind() == kind)
    .ok_or(Error::NotFound { kind, id })
}

/// Resolve the references `touched` selects, verify list-valued ones, and
/// derive booth ancestry where the kind asks for it.
async fn resolve_value<S: ElectionStore>(
  store: &S,
  value: &mut FactValue,
  touched: impl Fn(&str) -> bool,
) -> Result<Vec<ResolvedRef>> {
  let refs: Vec<_> = value.references().into_iter().filter(|r| touched(r.field)).collect();
  let resolved = resolver::resolve(store, &refs).await?;

  for bulk in value.bulk_references() {
    if touched(bulk.field) {
      resolver::verify_bulk(store, &bulk).await?;
    }
  }

  if let Some(booth_id) = value.ancestry_source() {
    let booth = resolved.iter().find_map(|r| match &r.entity {
      Resolved::Node(node) if node.id == booth_id => Some(node.clone()),
      _ => None,
    });
    if let Some(booth) = booth {
      let filled = value.fill_ancestry(&booth, &touched);
      if !filled.is_empty() {
        debug!(?filled, booth = %booth_id, "derived ancestry from booth");
      }
    }
  }
  Ok(resolved)
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// Validate and persist a new fact of `kind` from its JSON payload.
pub async fn create_fact<S: ElectionStore>(
  store: &S,
  kind: FactKind,
  data: Value,
  caller: Uuid,
) -> Result<FactView> {
  let mut value = decode(kind, data)?;
  value.normalize();
  value.apply_caller_defaults(caller);

  let resolved = resolve_value(store, &mut value, |_| true).await?;
  resolver::check_chain(store, &value, &resolved).await?;
  value.validate(&resolved)?;
  guard::check(store, &value, None).await?;

  let fact = Fact {
    fact_id: Uuid::new_v4(),
    value,
    audit: Audit::new(caller),
  };
  if let WriteOutcome::Conflict(conflict) = store.insert_fact(&fact).await.map_err(Error::store)? {
    return Err(guard::conflict_error(&fact.value, conflict));
  }
  info!(%kind, id = %fact.fact_id, %caller, "fact created");
  describe(store, fact, resolved).await
}

/// Apply a partial update. Fields absent from `patch` keep their stored
/// values and only references named in `patch` are re-resolved.
pub async fn update_fact<S: ElectionStore>(
  store: &S,
  kind: FactKind,
  id: Uuid,
  patch: Map<String, Value>,
  caller: Uuid,
) -> Result<FactView> {
  let mut fact = fetch(store, kind, id).await?;
  let mut body = match fact.value.to_json().map_err(Error::store)? {
    Value::Object(body) => body,
    _ => Map::new(),
  };

  for field in kind.frozen_fields() {
    if let Some(new) = patch.get(*field)
      && !same_value(body.get(*field), new)
    {
      return Err(Error::validation(*field, "cannot be changed"));
    }
  }

  let touched: Vec<String> = patch.keys().cloned().collect();
  body.extend(patch);
  let mut value = decode(kind, Value::Object(body))?;
  value.normalize();
  value.apply_caller_defaults(caller);
  value.carry_from(&fact.value);

  let is_touched = |field: &str| touched.iter().any(|t| t == field);
  let resolved = resolve_value(store, &mut value, is_touched).await?;
  if value.hierarchy_refs().iter().any(|(field, ..)| is_touched(*field)) {
    resolver::check_chain(store, &value, &resolved).await?;
  }
  value.validate(&resolved)?;
  guard::check(store, &value, Some(id)).await?;

  fact.value = value;
  fact.audit.touch(caller);
  if let WriteOutcome::Conflict(conflict) = store.update_fact(&fact).await.map_err(Error::store)? {
    return Err(guard::conflict_error(&fact.value, conflict));
  }
  info!(%kind, %id, %caller, fields = ?touched, "fact updated");
  describe(store, fact, resolved).await
}

/// Ids compare by value so that a differently-cased uuid is still "equal".
fn same_value(current: Option<&Value>, new: &Value) -> bool {
  let as_id = |v: &Value| v.as_str().and_then(|s| Uuid::parse_str(s).ok());
  match current {
    Some(current) => current == new || (as_id(current).is_some() && as_id(current) == as_id(new)),
    None => new.is_null(),
  }
}

/// Hard-delete a fact that nothing else links to.
pub async fn delete_fact<S: ElectionStore>(store: &S, kind: FactKind, id: Uuid) -> Result<()> {
  fetch(store, kind, id).await?;
  match store.delete_fact(id).await.map_err(Error::store)? {
    DeleteOutcome::Deleted => {
      info!(%kind, %id, "fact deleted");
      Ok(())
    }
    DeleteOutcome::Missing => Err(Error::NotFound { kind, id }),
    DeleteOutcome::InUse(n) => Err(Error::validation("id", format!("referenced by {n} records"))),
  }
}

// ─── Reads ───────────────────────────────────────────────────────────────────

pub async fn get_fact<S: ElectionStore>(store: &S, kind: FactKind, id: Uuid) -> Result<FactView> {
  let fact = fetch(store, kind, id).await?;
  describe(store, fact, Vec::new()).await
}

/// Filters accepted by [`list_facts`]. Field names must be declared by the
/// kind.
#[derive(Debug, Clone, Default)]
pub struct FactFilter {
  pub eq:     Vec<(String, Uuid)>,
  pub text:   Option<String>,
  pub ranges: Vec<NumericRange>,
  pub dates:  Vec<DateRange>,
}

impl FactFilter {
  fn into_query(self, kind: FactKind) -> Result<FactQuery> {
    for (field, _) in &self.eq {
      if !kind.reference_fields().contains(&field.as_str()) {
        return Err(Error::validation(field, format!("not a filterable field of {kind}")));
      }
    }
    for range in &self.ranges {
      if !kind.numeric_fields().contains(&range.field.as_str()) {
        return Err(Error::validation(&range.field, format!("not a numeric field of {kind}")));
      }
      if let (Some(min), Some(max)) = (range.min, range.max)
        && min > max
      {
        return Err(Error::validation(&range.field, "minimum exceeds maximum"));
      }
    }
    for range in &self.dates {
      if !kind.date_fields().contains(&range.field.as_str()) {
        return Err(Error::validation(&range.field, format!("not a date field of {kind}")));
      }
      if let (Some(from), Some(to)) = (range.from, range.to)
        && from > to
      {
        return Err(Error::validation(&range.field, "start is after end"));
      }
    }
    let text = self.text.map(|t| t.trim().to_owned()).filter(|t| !t.is_empty());
    if text.is_some() && kind.text_fields().is_empty() {
      return Err(Error::validation("q", format!("{kind} has no searchable text")));
    }

    Ok(FactQuery {
      eq: self.eq,
      text,
      text_fields: kind.text_fields().iter().map(|f| (*f).to_owned()).collect(),
      ranges: self.ranges,
      dates: self.dates,
      ..FactQuery::kind(kind)
    })
  }
}

/// One page of `kind` records matching `filter`, in insertion order.
pub async fn list_facts<S: ElectionStore>(
  store: &S,
  kind: FactKind,
  filter: FactFilter,
  page: PageRequest,
) -> Result<Page<FactView>> {
  let mut query = filter.into_query(kind)?;
  let total = store.count_facts(&query).await.map_err(Error::store)?;
  query.limit = Some(page.limit());
  query.offset = Some(page.offset());
  let facts = store.list_facts(&query).await.map_err(Error::store)?;
  Ok(Page::new(page, total, facts).map(FactView::bare))
}
