//! Handlers for `/rollup` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/rollup` | Optional pins `state`, `division`, `parliament`, `assembly`, `block`, `booth` |
//! | `GET`  | `/rollup/{level}/{id}` | Everything below one node; 404 if the node is missing |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use psephos_core::{
  hierarchy::Level,
  page::Page,
  rollup::{self, RollupRow},
  store::ElectionStore,
};

use crate::{
  AppState,
  error::ApiError,
  params::{self, RawParams},
};

/// `GET /rollup[?division=<id>][&assembly=<id>][&page=...][&page_size=...]`
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Query(mut raw): Query<RawParams>,
) -> Result<Json<Page<RollupRow>>, ApiError>
where
  S: ElectionStore,
{
  let page = params::take_page(&mut raw, state.paging.rollup_default, state.paging.max)?;
  let filter = params::rollup_filter(raw)?;
  Ok(Json(rollup::rollup(state.store.as_ref(), filter, page).await?))
}

/// `GET /rollup/{level}/{id}[?page=...][&page_size=...]`
pub async fn from_node<S>(
  State(state): State<AppState<S>>,
  Path((level, id)): Path<(String, String)>,
  Query(mut raw): Query<RawParams>,
) -> Result<Json<Page<RollupRow>>, ApiError>
where
  S: ElectionStore,
{
  let level: Level = level.parse()?;
  let page = params::take_page(&mut raw, state.paging.rollup_default, state.paging.max)?;
  params::reject_leftovers(raw)?;
  Ok(Json(rollup::rollup_from(state.store.as_ref(), level, &id, page).await?))
}
