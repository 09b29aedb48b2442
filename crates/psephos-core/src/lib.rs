//! Core types and trait definitions for the Psephos election ledger.
//!
//! Everything here is free of HTTP and database dependencies. The write
//! pipeline, reference resolver, uniqueness guard and roll-up entry points are
//! generic over [`store::ElectionStore`]; storage backends implement the trait
//! and the API layer drives the pipeline.

pub mod audit;
pub mod error;
pub mod fact;
pub mod guard;
pub mod hierarchy;
pub mod nodes;
pub mod page;
pub mod pipeline;
pub mod resolver;
pub mod rollup;
pub mod rules;
pub mod schema;
pub mod store;

pub use error::{Error, Result};

/// Parse a caller-supplied id, reporting a malformed value as a validation
/// error against `field`.
pub fn parse_id(field: &str, raw: &str) -> Result<uuid::Uuid> {
  uuid::Uuid::parse_str(raw.trim())
    .map_err(|_| Error::validation(field, format!("{raw:?} is not a valid id")))
}
