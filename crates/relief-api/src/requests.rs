//! Handlers for `/requests` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/requests` | Requesters only; `201` with the stored request |
//! | `GET`    | `/requests` | Organizations only; `?status=&kind=&requester_id=&responder_id=&limit=&offset=` |
//! | `GET`    | `/requests/mine` | Own requests (requester) or assignments (responder) |
//! | `GET`    | `/requests/available` | Pending, unassigned requests |
//! | `GET`    | `/requests/{id}` | Sets `ETag` |
//! | `POST`   | `/requests/{id}/accept` | Responders only; `409` once taken |
//! | `PATCH`  | `/requests/{id}/status` | Body: `{"status":"in_progress"}`; honours `If-Match` |
//! | `DELETE` | `/requests/{id}` | `204`; honours `If-Match` |

use axum::{
  Json,
  extract::{Path, Query, State, rejection::JsonRejection},
  http::{HeaderMap, StatusCode, header},
  response::IntoResponse,
};
use relief_core::{
  Request, RequestService, RequestStatus,
  clock::Clock,
  request::{DisasterKind, NewRequest},
  service::StatusChange,
  store::{RequestFilter, RequestStore},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  error::ApiError,
  etag::{compute_etag, etag_header, if_match_satisfied},
  identity::CurrentActor,
};

/// Largest page `GET /requests` hands out.
pub const MAX_PAGE: usize = 100;

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /requests`
pub async fn create<S, C>(
  State(service): State<RequestService<S, C>>,
  CurrentActor(actor): CurrentActor,
  body: Result<Json<NewRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RequestStore,
  C: Clock,
{
  let Json(input) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let request = service.create_request(&actor, input).await?;
  Ok((StatusCode::CREATED, [etag_header(&request)], Json(request)))
}

// ─── Lists ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub status:       Option<RequestStatus>,
  pub kind:         Option<DisasterKind>,
  pub requester_id: Option<Uuid>,
  pub responder_id: Option<Uuid>,
  pub limit:        Option<usize>,
  pub offset:       Option<usize>,
}

impl From<ListParams> for RequestFilter {
  fn from(p: ListParams) -> Self {
    RequestFilter {
      requester_id: p.requester_id,
      assigned_responder_id: p.responder_id,
      status: p.status,
      kind: p.kind,
      unassigned_only: false,
      limit: Some(p.limit.unwrap_or(MAX_PAGE).min(MAX_PAGE)),
      offset: p.offset,
    }
  }
}

/// `GET /requests[?status=..&kind=..&limit=..&offset=..]`
pub async fn list_all<S, C>(
  State(service): State<RequestService<S, C>>,
  CurrentActor(actor): CurrentActor,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Request>>, ApiError>
where
  S: RequestStore,
  C: Clock,
{
  let filter = RequestFilter::from(params);
  Ok(Json(service.list_all(&actor, &filter).await?))
}

/// `GET /requests/mine`
pub async fn list_mine<S, C>(
  State(service): State<RequestService<S, C>>,
  CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<Request>>, ApiError>
where
  S: RequestStore,
  C: Clock,
{
  Ok(Json(service.list_mine(&actor).await?))
}

/// `GET /requests/available`
pub async fn list_available<S, C>(
  State(service): State<RequestService<S, C>>,
  CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<Request>>, ApiError>
where
  S: RequestStore,
  C: Clock,
{
  Ok(Json(service.list_available(&actor).await?))
}

// ─── Single request ───────────────────────────────────────────────────────────

/// `GET /requests/{id}`
pub async fn get_one<S, C>(
  State(service): State<RequestService<S, C>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RequestStore,
  C: Clock,
{
  let request = service.get_request(&actor, id).await?;
  Ok(([etag_header(&request)], Json(request)))
}

/// `POST /requests/{id}/accept`
pub async fn accept<S, C>(
  State(service): State<RequestService<S, C>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RequestStore,
  C: Clock,
{
  let request = service.accept_request(&actor, id).await?;
  Ok(([etag_header(&request)], Json(request)))
}

/// `PATCH /requests/{id}/status`
pub async fn change_status<S, C>(
  State(service): State<RequestService<S, C>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
  body: Result<Json<StatusChange>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RequestStore,
  C: Clock,
{
  let Json(change) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let request = service
    .change_status_if(&actor, id, change, if_match(&headers))
    .await?;
  Ok(([etag_header(&request)], Json(request)))
}

/// `DELETE /requests/{id}`
pub async fn delete_one<S, C>(
  State(service): State<RequestService<S, C>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
) -> Result<StatusCode, ApiError>
where
  S: RequestStore,
  C: Clock,
{
  service.delete_request_if(&actor, id, if_match(&headers)).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// The `If-Match` header as a precondition on the record a write starts from.
fn if_match(headers: &HeaderMap) -> Option<impl FnOnce(&Request) -> bool + '_> {
  headers
    .contains_key(header::IF_MATCH)
    .then(|| |current: &Request| if_match_satisfied(headers, &compute_etag(current)))
}
