//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Core errors keep their structure on the wire: the JSON body names the
//! error `code` and carries the offending fields and ids.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use psephos_core::Error;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] Error),

  /// The `x-caller-id` header is missing or not a UUID.
  #[error("missing or malformed caller identity")]
  Unauthorized,
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Core(e) => match e {
        Error::Validation { .. } => StatusCode::BAD_REQUEST,
        Error::ReferenceNotFound { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        Error::DuplicateRecord { .. } | Error::NodeInUse { .. } => StatusCode::CONFLICT,
        Error::NodeNotFound { .. } | Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }

  fn body(&self) -> Value {
    let message = self.to_string();
    let ApiError::Core(e) = self else {
      return json!({ "code": "unauthorized", "error": message });
    };
    match e {
      Error::ReferenceNotFound { field } => json!({
        "code": "reference_not_found",
        "error": message,
        "field": field,
      }),
      Error::DuplicateRecord { conflicting_fields, existing_id } => json!({
        "code": "duplicate_record",
        "error": message,
        "conflicting_fields": conflicting_fields,
        "existing_id": existing_id,
      }),
      Error::Validation { field, reason } => json!({
        "code": "validation",
        "error": message,
        "field": field,
        "reason": reason,
      }),
      Error::NodeNotFound { level, id } => json!({
        "code": "node_not_found",
        "error": message,
        "level": level,
        "id": id,
      }),
      Error::NotFound { kind, id } => json!({
        "code": "not_found",
        "error": message,
        "kind": kind,
        "id": id,
      }),
      Error::NodeInUse { level, id, dependents } => json!({
        "code": "node_in_use",
        "error": message,
        "level": level,
        "id": id,
        "dependents": dependents,
      }),
      Error::Store(_) => json!({ "code": "store", "error": message }),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(error = %self, "request failed");
    }
    (status, Json(self.body())).into_response()
  }
}
