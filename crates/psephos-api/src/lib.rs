//! JSON REST API for Psephos.
//!
//! Exposes an axum [`Router`] backed by any [`psephos_core::store::ElectionStore`].
//! Authentication and TLS are the caller's responsibility; writes expect an
//! already-authenticated `x-caller-id` header.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", psephos_api::api_router(store.clone(), Paging::default()))
//! ```

pub mod caller;
pub mod error;
pub mod facts;
pub mod nodes;
pub mod params;
pub mod rollup;

use std::sync::Arc;

use axum::{Router, routing::get};
use psephos_core::store::ElectionStore;

pub use error::ApiError;
pub use params::Paging;

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub paging: Paging,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      paging: self.paging,
    }
  }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, paging: Paging) -> Router<()>
where
  S: ElectionStore + 'static,
{
  Router::new()
    // Hierarchy
    .route("/nodes/{level}", get(nodes::list::<S>).post(nodes::create::<S>))
    .route(
      "/nodes/{level}/{id}",
      get(nodes::get_one::<S>)
        .patch(nodes::update::<S>)
        .delete(nodes::delete_one::<S>),
    )
    // Facts
    .route("/facts/{kind}", get(facts::list::<S>).post(facts::create::<S>))
    .route(
      "/facts/{kind}/{id}",
      get(facts::get_one::<S>)
        .patch(facts::update::<S>)
        .delete(facts::delete_one::<S>),
    )
    // Roll-up
    .route("/rollup", get(rollup::handler::<S>))
    .route("/rollup/{level}/{id}", get(rollup::from_node::<S>))
    .with_state(AppState { store, paging })
}
