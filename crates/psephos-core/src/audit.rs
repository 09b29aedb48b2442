//! Audit stamps shared by hierarchy nodes and fact records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who created and last modified a record, and when.
///
/// `updated_by` names the last writer only; it does not imply shared
/// ownership of the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
  pub created_by: Uuid,
  pub updated_by: Uuid,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Audit {
  pub fn new(caller: Uuid) -> Self {
    let now = Utc::now();
    Self {
      created_by: caller,
      updated_by: caller,
      created_at: now,
      updated_at: now,
    }
  }

  /// Record a modification by `caller`.
  pub fn touch(&mut self, caller: Uuid) {
    self.updated_by = caller;
    self.updated_at = Utc::now();
  }
}
