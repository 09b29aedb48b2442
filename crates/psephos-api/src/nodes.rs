//! Handlers for `/nodes` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/nodes/{level}` | Optional `parent_id`, `q`, `page`, `page_size` |
//! | `POST`   | `/nodes/{level}` | Body: [`NodeInput`]; returns 201 + the node |
//! | `GET`    | `/nodes/{level}/{id}` | 404 if not found |
//! | `PATCH`  | `/nodes/{level}/{id}` | Body: [`NodeInput`]; `parent_id` re-parents |
//! | `DELETE` | `/nodes/{level}/{id}` | 409 while anything depends on the node |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use psephos_core::{
  hierarchy::{Level, Node, NodeInput},
  nodes,
  page::Page,
  parse_id,
  store::ElectionStore,
};
use tracing::info;

use crate::{
  AppState,
  caller::Caller,
  error::ApiError,
  params::{self, RawParams},
};

/// `GET /nodes/{level}[?parent_id=...][&q=...][&page=...][&page_size=...]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Path(level): Path<String>,
  Query(mut raw): Query<RawParams>,
) -> Result<Json<Page<Node>>, ApiError>
where
  S: ElectionStore,
{
  let level: Level = level.parse()?;
  let page = params::take_page(&mut raw, state.paging.list_default, state.paging.max)?;
  let filter = params::node_filter(raw)?;
  let nodes = nodes::list_nodes(state.store.as_ref(), level, filter, page).await?;
  Ok(Json(nodes))
}

/// `POST /nodes/{level}`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Path(level): Path<String>,
  caller: Caller,
  Json(input): Json<NodeInput>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ElectionStore,
{
  let level: Level = level.parse()?;
  let node = nodes::create_node(state.store.as_ref(), level, input, caller.id).await?;
  Ok((StatusCode::CREATED, Json(node)))
}

/// `GET /nodes/{level}/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path((level, id)): Path<(String, String)>,
) -> Result<Json<Node>, ApiError>
where
  S: ElectionStore,
{
  let level: Level = level.parse()?;
  let id = parse_id("id", &id)?;
  Ok(Json(nodes::get_node(state.store.as_ref(), level, id).await?))
}

/// `PATCH /nodes/{level}/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Path((level, id)): Path<(String, String)>,
  caller: Caller,
  Json(input): Json<NodeInput>,
) -> Result<Json<Node>, ApiError>
where
  S: ElectionStore,
{
  let level: Level = level.parse()?;
  let id = parse_id("id", &id)?;
  let node = nodes::update_node(state.store.as_ref(), level, id, input, caller.id).await?;
  Ok(Json(node))
}

/// `DELETE /nodes/{level}/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  Path((level, id)): Path<(String, String)>,
  caller: Caller,
) -> Result<StatusCode, ApiError>
where
  S: ElectionStore,
{
  let level: Level = level.parse()?;
  let id = parse_id("id", &id)?;
  info!(caller = %caller.id, roles = ?caller.roles, %level, %id, "node delete requested");
  nodes::delete_node(state.store.as_ref(), level, id).await?;
  Ok(StatusCode::NO_CONTENT)
}
