//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! | Error | Status |
//! |-------|--------|
//! | validation failure, malformed body | 400 |
//! | invalid status transition | 400 |
//! | no authenticated actor | 401 |
//! | forbidden by the access guard | 403 |
//! | unknown request | 404 |
//! | request no longer available | 409 |
//! | stale `If-Match` | 412 |
//! | store failure | 500 |

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use relief_core::{Error as CoreError, guard::Denial};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] CoreError),

  #[error("authentication required")]
  Unauthorized,

  #[error("bad request: {0}")]
  BadRequest(String),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Core(e) => match e {
        CoreError::Validation(_) | CoreError::InvalidTransition { .. } => {
          StatusCode::BAD_REQUEST
        }
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
        CoreError::RequestUnavailable(_) => StatusCode::CONFLICT,
        CoreError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
        CoreError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
      },
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();

    let body = match &self {
      ApiError::Core(CoreError::Validation(fields)) => {
        json!({ "error": "validation failed", "fields": fields })
      }
      ApiError::Core(CoreError::Forbidden(Denial::DeleteRefused { status, deletable, .. })) => {
        json!({ "error": self.to_string(), "status": status, "deletable": deletable })
      }
      ApiError::Core(CoreError::Store(e)) => {
        tracing::error!(error = %e, "store failure");
        json!({ "error": "internal error" })
      }
      _ => json!({ "error": self.to_string() }),
    };

    let mut res = (status, Json(body)).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"relief\""),
      );
    }
    res
  }
}
