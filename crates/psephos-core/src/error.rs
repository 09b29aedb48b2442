//! Error taxonomy for `psephos-core`.
//!
//! Every variant except [`Error::Store`] describes bad input and carries
//! enough structure for the caller to build a precise message. Storage faults
//! are boxed and propagated untouched.

use thiserror::Error;
use uuid::Uuid;

use crate::{fact::FactKind, hierarchy::Level};

#[derive(Debug, Error)]
pub enum Error {
  /// A declared foreign key does not resolve.
  #[error("reference not found: {field}")]
  ReferenceNotFound { field: String },

  /// A natural key is already taken by another record.
  #[error(
    "duplicate record: ({}) already used by {existing_id}",
    conflicting_fields.join(", ")
  )]
  DuplicateRecord {
    conflicting_fields: Vec<String>,
    existing_id:        Uuid,
  },

  #[error("invalid {field}: {reason}")]
  Validation { field: String, reason: String },

  /// The starting node of a roll-up, or an addressed hierarchy node, is
  /// missing. `id` is kept verbatim since it may not even parse.
  #[error("{level} {id} not found")]
  NodeNotFound { level: Level, id: String },

  #[error("{kind} {id} not found")]
  NotFound { kind: FactKind, id: Uuid },

  /// Deleting the node would leave children, facts or committees dangling.
  #[error("{level} {id} still has {dependents} dependent record(s)")]
  NodeInUse {
    level:      Level,
    id:         Uuid,
    dependents: u64,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
    Self::Validation {
      field:  field.into(),
      reason: reason.into(),
    }
  }

  pub fn reference_not_found(field: impl Into<String>) -> Self {
    Self::ReferenceNotFound { field: field.into() }
  }

  pub fn node_not_found(level: Level, id: impl ToString) -> Self {
    Self::NodeNotFound {
      level,
      id: id.to_string(),
    }
  }

  /// Box a backend error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  /// `true` for every variant that reflects caller input rather than a
  /// storage fault.
  pub fn is_caller_error(&self) -> bool { !matches!(self, Self::Store(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
