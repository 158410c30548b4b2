//! The authenticated caller, as handed over by the outer auth layer.

use axum::{extract::FromRequestParts, http::request::Parts};
use relief_core::Actor;

use crate::error::ApiError;

/// Extracts the [`Actor`] an outer middleware stored in the request
/// extensions. Rejects with `401` when none is present.
#[derive(Debug, Clone, Copy)]
pub struct CurrentActor(pub Actor);

impl<S: Send + Sync> FromRequestParts<S> for CurrentActor {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<Actor>()
      .copied()
      .map(CurrentActor)
      .ok_or(ApiError::Unauthorized)
  }
}
