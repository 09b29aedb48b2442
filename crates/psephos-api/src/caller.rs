//! Caller identity extractor.
//!
//! Authentication happens upstream; this layer only reads the identity the
//! gateway forwards and stamps it on writes.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::ApiError;

pub const CALLER_ID_HEADER: &str = "x-caller-id";
pub const CALLER_ROLES_HEADER: &str = "x-caller-roles";

/// The identity behind a request. Authorization is settled upstream, so
/// `roles` are only carried into the delete logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
  pub id:    Uuid,
  pub roles: Vec<String>,
}

impl<T> FromRequestParts<T> for Caller
where
  T: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &T) -> Result<Self, Self::Rejection> {
    let id = parts
      .headers
      .get(CALLER_ID_HEADER)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| Uuid::parse_str(v.trim()).ok())
      .ok_or(ApiError::Unauthorized)?;

    let roles = parts
      .headers
      .get(CALLER_ROLES_HEADER)
      .and_then(|v| v.to_str().ok())
      .map(|v| {
        v.split(',')
          .map(str::trim)
          .filter(|r| !r.is_empty())
          .map(str::to_owned)
          .collect()
      })
      .unwrap_or_default();

    Ok(Caller { id, roles })
  }
}
