//! Error types for `relief-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{guard::Denial, request::{FieldError, RequestStatus}};

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {}", describe_fields(.0))]
  Validation(Vec<FieldError>),

  #[error("request not found: {0}")]
  NotFound(Uuid),

  #[error("forbidden: {0}")]
  Forbidden(Denial),

  #[error("request {0} is no longer available")]
  RequestUnavailable(Uuid),

  #[error("request {0} has been modified")]
  PreconditionFailed(Uuid),

  #[error("invalid status transition from {from} to {to}")]
  InvalidTransition {
    from: RequestStatus,
    to:   RequestStatus,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

impl From<Denial> for Error {
  fn from(d: Denial) -> Self { Self::Forbidden(d) }
}

fn describe_fields(fields: &[FieldError]) -> String {
  fields
    .iter()
    .map(|f| format!("{}: {}", f.field, f.message))
    .collect::<Vec<_>>()
    .join("; ")
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
