//! Uniqueness guard: early rejection of natural-key collisions.
//!
//! The guard is not atomic with the insert that follows it. Backends enforce
//! the same keys with unique constraints, and [`conflict_error`] turns a race
//! lost at that layer into the same error the guard would have raised.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  fact::FactValue,
  schema::UniqueKey,
  store::{ElectionStore, KeyConflict},
};

/// Reject `value` if another record of its kind holds any of its natural
/// keys. `own_id` is excluded so that an update never conflicts with itself.
pub async fn check<S: ElectionStore>(
  store: &S,
  value: &FactValue,
  own_id: Option<Uuid>,
) -> Result<()> {
  let kind = value.kind();
  for key in value.unique_keys() {
    let existing = store
      .find_fact_by_key(kind, key.name, &key.value, own_id)
      .await
      .map_err(Error::store)?;
    if let Some(existing_id) = existing {
      debug!(%kind, key = key.name, %existing_id, "natural key already taken");
      return Err(duplicate(key, existing_id));
    }
  }
  Ok(())
}

/// Translate a storage-level unique violation for `value` into the error the
/// guard reports.
pub fn conflict_error(value: &FactValue, conflict: KeyConflict) -> Error {
  warn!(
    kind = %value.kind(),
    key = %conflict.key,
    existing_id = %conflict.existing_id,
    "unique constraint rejected write after guard passed"
  );
  let fields = value
    .unique_keys()
    .into_iter()
    .find(|k| k.name == conflict.key)
    .map(|k| k.fields.into_iter().map(str::to_owned).collect())
    .unwrap_or_else(|| vec![conflict.key.clone()]);
  Error::DuplicateRecord {
    conflicting_fields: fields,
    existing_id:        conflict.existing_id,
  }
}

fn duplicate(key: UniqueKey, existing_id: Uuid) -> Error {
  Error::DuplicateRecord {
    conflicting_fields: key.fields.into_iter().map(str::to_owned).collect(),
    existing_id,
  }
}
