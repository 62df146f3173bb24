//! HTTP server for Rubriq.
//!
//! Wires the JSON API from `rubriq-api` behind Basic authentication, adds a
//! health check and request tracing, and defines the configuration read by
//! the `rubriq-server` binary.

pub mod auth;
pub mod error;

pub use error::Error;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::{Json, Router, middleware, routing::get};
use rubriq_core::{grade::Grader, store::GradingStore};
use rubriq_openai::OpenAiConfig;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use auth::AuthState;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `RUBRIQ_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  /// Required by `serve`; the operator subcommands run without it.
  #[serde(default)]
  pub openai:     Option<OpenAiConfig>,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("rubriq.db") }

impl ServerConfig {
  /// Read `path` (if it exists) layered under the environment, where
  /// `RUBRIQ_OPENAI__API_KEY` sets `openai.api_key`.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    Self::from_builder(
      config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
          config::Environment::with_prefix("RUBRIQ")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
        ),
    )
  }

  fn from_builder(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
  ) -> Result<Self, config::ConfigError> {
    builder.build()?.try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
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

async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

/// Build the full application router: `/health` is open, everything under
/// `/api` requires a teacher's credentials.
pub fn router<S, G>(store: Arc<S>, grader: Arc<G>) -> Router
where
  S: GradingStore + 'static,
  G: Grader + 'static,
{
  let auth_state = AuthState { store: store.clone() };
  let api = rubriq_api::api_router(store, grader).layer(middleware::from_fn_with_state(
    auth_state,
    auth::require_teacher::<S>,
  ));

  Router::new()
    .route("/health", get(health))
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
