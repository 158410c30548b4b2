//! `GET /stats`: dashboard counters for organizations.

use axum::{Json, extract::State};
use relief_core::{RequestService, clock::Clock, store::{RequestStats, RequestStore}};

use crate::{error::ApiError, identity::CurrentActor};

/// `GET /stats`
pub async fn handler<S, C>(
  State(service): State<RequestService<S, C>>,
  CurrentActor(actor): CurrentActor,
) -> Result<Json<RequestStats>, ApiError>
where
  S: RequestStore,
  C: Clock,
{
  Ok(Json(service.stats(&actor).await?))
}
