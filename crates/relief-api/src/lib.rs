//! JSON REST API for Relief.
//!
//! Exposes an axum [`Router`] over a [`RequestService`]. Authentication is the
//! caller's responsibility: an outer layer must place the verified
//! [`relief_core::Actor`] in the request extensions before a handler runs.
//! Requests without one are answered with `401`.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", relief_api::api_router(service.clone()))
//! ```

pub mod error;
pub mod etag;
pub mod identity;
pub mod requests;
pub mod stats;

use axum::{
  Router,
  routing::{get, patch, post},
};
use relief_core::{RequestService, clock::Clock, store::RequestStore};

pub use error::ApiError;
pub use identity::CurrentActor;

/// Build a fully-materialised API router for `service`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, C>(service: RequestService<S, C>) -> Router<()>
where
  S: RequestStore + 'static,
  C: Clock + Clone + 'static,
{
  Router::new()
    // Requests
    .route("/requests", get(requests::list_all::<S, C>).post(requests::create::<S, C>))
    .route("/requests/mine", get(requests::list_mine::<S, C>))
    .route("/requests/available", get(requests::list_available::<S, C>))
    .route(
      "/requests/{id}",
      get(requests::get_one::<S, C>).delete(requests::delete_one::<S, C>),
    )
    .route("/requests/{id}/accept", post(requests::accept::<S, C>))
    .route("/requests/{id}/status", patch(requests::change_status::<S, C>))
    // Dashboard
    .route("/stats", get(stats::handler::<S, C>))
    .with_state(service)
}

#[cfg(test)]
mod tests;
