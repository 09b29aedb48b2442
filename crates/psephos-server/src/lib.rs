//! Server wiring for Psephos: configuration loading and the top-level router.
//!
//! The binary in `main.rs` parses the command line, initialises tracing and
//! serves [`app`]; everything testable lives here.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::{Context as _, ensure};
use axum::Router;
use psephos_api::Paging;
use psephos_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

/// Environment variables with this prefix override the config file, e.g.
/// `PSEPHOS_PORT=9000`.
pub const ENV_PREFIX: &str = "PSEPHOS";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and the
/// environment.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
  pub host:              String,
  pub port:              u16,
  pub store_path:        PathBuf,
  pub default_page_size: u64,
  pub rollup_page_size:  u64,
  pub max_page_size:     u64,
}

impl ServerConfig {
  pub fn paging(&self) -> Paging {
    Paging {
      list_default:   self.default_page_size,
      rollup_default: self.rollup_page_size,
      max:            self.max_page_size,
    }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Read `path` (optional) layered under `PSEPHOS_*` environment variables.
pub fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  let paging = Paging::default();
  let settings = config::Config::builder()
    .set_default("host", "127.0.0.1")?
    .set_default("port", 8080)?
    .set_default("store_path", "psephos.db")?
    .set_default("default_page_size", paging.list_default)?
    .set_default("rollup_page_size", paging.rollup_default)?
    .set_default("max_page_size", paging.max)?
    .add_source(config::File::from(path.to_path_buf()).required(false))
    .add_source(config::Environment::with_prefix(ENV_PREFIX))
    .build()
    .context("failed to read config file")?;

  let mut cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  ensure!(cfg.max_page_size > 0, "max_page_size must be positive");
  for (name, size) in [
    ("default_page_size", cfg.default_page_size),
    ("rollup_page_size", cfg.rollup_page_size),
  ] {
    ensure!(
      (1..=cfg.max_page_size).contains(&size),
      "{name} must be between 1 and max_page_size ({})",
      cfg.max_page_size
    );
  }

  cfg.store_path = expand_tilde(&cfg.store_path);
  Ok(cfg)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API mounted under `/api`, with request tracing.
pub fn app(store: Arc<SqliteStore>, config: &ServerConfig) -> Router {
  Router::new()
    .nest("/api", psephos_api::api_router(store, config.paging()))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use tower::ServiceExt;

  use super::*;

  #[test]
  fn missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_config(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.paging(), Paging::default());
  }

  #[test]
  fn file_overrides_defaults() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
      file,
      "host = \"0.0.0.0\"\nport = 9100\nstore_path = \"/var/lib/psephos.db\"\nmax_page_size = 50"
    )
    .unwrap();

    let cfg = load_config(file.path()).unwrap();
    assert_eq!(cfg.address(), "0.0.0.0:9100");
    assert_eq!(cfg.store_path, PathBuf::from("/var/lib/psephos.db"));
    assert_eq!(cfg.paging().max, 50);
    assert_eq!(cfg.paging().list_default, 10);
  }

  #[test]
  fn default_page_size_cannot_exceed_max() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "default_page_size = 40\nmax_page_size = 20").unwrap();
    assert!(load_config(file.path()).is_err());
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/x.db")), PathBuf::from(home).join("x.db"));
    assert_eq!(expand_tilde(Path::new("/abs/x.db")), PathBuf::from("/abs/x.db"));
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_config(&dir.path().join("absent.toml")).unwrap();
    let store = SqliteStore::open(dir.path().join("test.db")).await.unwrap();
    let app = app(Arc::new(store), &cfg);

    let req = Request::builder().uri("/api/rollup").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let req = Request::builder().uri("/rollup").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
