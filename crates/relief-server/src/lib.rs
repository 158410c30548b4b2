//! HTTP server for Relief.
//!
//! Wraps the [`relief_api`] router with Basic authentication and request
//! tracing. The binary in `main.rs` adds configuration loading and the SQLite
//! store.

pub mod auth;
pub mod error;

pub use error::Error;

use std::{collections::HashSet, path::PathBuf, sync::Arc};

use argon2::PasswordHash;
use axum::{Router, middleware, routing::get};
use relief_core::{RequestService, clock::Clock, store::RequestStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::AccountConfig;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  #[serde(default)]
  pub accounts:   Vec<AccountConfig>,
}

impl ServerConfig {
  /// Reject configurations that would make logins ambiguous or impossible.
  pub fn validate(&self) -> Result<(), Error> {
    let mut seen = HashSet::new();
    for account in &self.accounts {
      if !seen.insert(account.username.as_str()) {
        return Err(Error::DuplicateAccount(account.username.clone()));
      }
      if PasswordHash::new(&account.password_hash).is_err() {
        return Err(Error::InvalidPasswordHash(account.username.clone()));
      }
    }
    Ok(())
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application: the authenticated API plus an open `/health`
/// probe, all traced.
pub fn app<S, C>(service: RequestService<S, C>, accounts: Arc<[AccountConfig]>) -> Router
where
  S: RequestStore + 'static,
  C: Clock + Clone + 'static,
{
  let api = relief_api::api_router(service)
    .route_layer(middleware::from_fn_with_state(accounts, auth::require_actor));

  Router::new()
    .route("/health", get(|| async { "ok" }))
    .merge(api)
    .layer(TraceLayer::new_for_http())
}
