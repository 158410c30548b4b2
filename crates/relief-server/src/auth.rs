//! HTTP Basic-auth identity layer.
//!
//! Credentials are checked against the configured accounts; on success the
//! account's [`Actor`] is placed in the request extensions for the API
//! handlers to pick up.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, header},
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use relief_api::ApiError;
use relief_core::{Actor, Role};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

/// One login, as written in `config.toml`:
///
/// ```toml
/// [[accounts]]
/// username      = "dispatch"
/// user_id       = "5b0c1b9e-8f1a-4f57-9a53-2b7f4f0f3c11"
/// role          = "organization"
/// password_hash = "$argon2id$v=19$…"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
  pub username:      String,
  pub user_id:       Uuid,
  pub role:          Role,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

impl AccountConfig {
  pub fn actor(&self) -> Actor { Actor::new(self.user_id, self.role) }
}

/// Verify Basic credentials from `headers` and return the matching actor.
pub fn verify_auth(headers: &HeaderMap, accounts: &[AccountConfig]) -> Result<Actor, ApiError> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds = std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;

  let account = accounts
    .iter()
    .find(|a| a.username == username)
    .ok_or(ApiError::Unauthorized)?;

  let parsed_hash =
    PasswordHash::new(&account.password_hash).map_err(|_| ApiError::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Ok(account.actor())
}

/// Middleware: authenticate, then hand the request on with its [`Actor`].
pub async fn require_actor(
  State(accounts): State<Arc<[AccountConfig]>>,
  mut req: Request,
  next: Next,
) -> Result<Response, ApiError> {
  let actor = verify_auth(req.headers(), &accounts).inspect_err(|_| {
    debug!(path = %req.uri().path(), "authentication failed");
  })?;
  req.extensions_mut().insert(actor);
  Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
  use argon2::{PasswordHasher, password_hash::SaltString};
  use axum::http::HeaderValue;
  use rand_core::OsRng;

  use super::*;

  fn hash(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string()
  }

  fn accounts() -> Vec<AccountConfig> {
    vec![
      AccountConfig {
        username:      "ana".into(),
        user_id:       Uuid::new_v4(),
        role:          Role::Requester,
        password_hash: hash("secret"),
      },
      AccountConfig {
        username:      "dispatch".into(),
        user_id:       Uuid::new_v4(),
        role:          Role::Organization,
        password_hash: hash("hunter2"),
      },
    ]
  }

  fn basic(user: &str, pass: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    let encoded = B64.encode(format!("{user}:{pass}"));
    h.insert(header::AUTHORIZATION, HeaderValue::from_str(&format!("Basic {encoded}")).unwrap());
    h
  }

  #[test]
  fn correct_credentials_yield_account_actor() {
    let accounts = accounts();
    let actor = verify_auth(&basic("dispatch", "hunter2"), &accounts).unwrap();
    assert_eq!(actor, accounts[1].actor());
    assert_eq!(actor.role, Role::Organization);
  }

  #[test]
  fn wrong_password() {
    let accounts = accounts();
    assert!(matches!(
      verify_auth(&basic("ana", "hunter2"), &accounts),
      Err(ApiError::Unauthorized)
    ));
  }

  #[test]
  fn unknown_user() {
    assert!(matches!(
      verify_auth(&basic("mallory", "secret"), &accounts()),
      Err(ApiError::Unauthorized)
    ));
  }

  #[test]
  fn missing_header() {
    assert!(matches!(verify_auth(&HeaderMap::new(), &accounts()), Err(ApiError::Unauthorized)));
  }

  #[test]
  fn invalid_base64() {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic !!!not-base64!!!"));
    assert!(matches!(verify_auth(&h, &accounts()), Err(ApiError::Unauthorized)));
  }

  #[test]
  fn account_deserialises_legacy_role_name() {
    let account: AccountConfig = serde_json::from_str(
      r#"{"username":"v","user_id":"00000000-0000-0000-0000-000000000001","role":"volunteer","password_hash":"x"}"#,
    )
    .unwrap();
    assert_eq!(account.role, Role::Responder);
  }
}
