//! Handlers for `/facts` endpoints. `{kind}` is a fact kind name such as
//! `booth_votes` or `booth-votes`.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/facts/{kind}` | Equality, `q`, `_min`/`_max`, `_from`/`_to`, paging |
//! | `POST`   | `/facts/{kind}` | Body: the record; returns 201 + the record with labels |
//! | `GET`    | `/facts/{kind}/{id}` | Record plus reference labels |
//! | `PATCH`  | `/facts/{kind}/{id}` | Body: the fields to change |
//! | `DELETE` | `/facts/{kind}/{id}` | Refused while another record points at it |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use psephos_core::{
  fact::FactKind,
  page::Page,
  parse_id,
  pipeline::{self, FactView},
  store::ElectionStore,
};
use serde_json::{Map, Value};
use tracing::info;

use crate::{
  AppState,
  caller::Caller,
  error::ApiError,
  params::{self, RawParams},
};

/// `GET /facts/{kind}[?<reference>=<id>][&q=...][&<field>_min=...][&<field>_from=...]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Path(kind): Path<String>,
  Query(mut raw): Query<RawParams>,
) -> Result<Json<Page<FactView>>, ApiError>
where
  S: ElectionStore,
{
  let kind: FactKind = kind.parse()?;
  let page = params::take_page(&mut raw, state.paging.list_default, state.paging.max)?;
  let filter = params::fact_filter(raw)?;
  let facts = pipeline::list_facts(state.store.as_ref(), kind, filter, page).await?;
  Ok(Json(facts))
}

/// `POST /facts/{kind}`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Path(kind): Path<String>,
  caller: Caller,
  Json(data): Json<Value>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ElectionStore,
{
  let kind: FactKind = kind.parse()?;
  let view = pipeline::create_fact(state.store.as_ref(), kind, data, caller.id).await?;
  Ok((StatusCode::CREATED, Json(view)))
}

/// `GET /facts/{kind}/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path((kind, id)): Path<(String, String)>,
) -> Result<Json<FactView>, ApiError>
where
  S: ElectionStore,
{
  let kind: FactKind = kind.parse()?;
  let id = parse_id("id", &id)?;
  Ok(Json(pipeline::get_fact(state.store.as_ref(), kind, id).await?))
}

/// `PATCH /facts/{kind}/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Path((kind, id)): Path<(String, String)>,
  caller: Caller,
  Json(patch): Json<Map<String, Value>>,
) -> Result<Json<FactView>, ApiError>
where
  S: ElectionStore,
{
  let kind: FactKind = kind.parse()?;
  let id = parse_id("id", &id)?;
  let view = pipeline::update_fact(state.store.as_ref(), kind, id, patch, caller.id).await?;
  Ok(Json(view))
}

/// `DELETE /facts/{kind}/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  Path((kind, id)): Path<(String, String)>,
  caller: Caller,
) -> Result<StatusCode, ApiError>
where
  S: ElectionStore,
{
  let kind: FactKind = kind.parse()?;
  let id = parse_id("id", &id)?;
  info!(caller = %caller.id, roles = ?caller.roles, %kind, %id, "fact delete requested");
  pipeline::delete_fact(state.store.as_ref(), kind, id).await?;
  Ok(StatusCode::NO_CONTENT)
}
