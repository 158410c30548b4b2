//! Router tests against an in-memory store.

use std::{
  convert::Infallible,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
};

use axum::{
  body::Body,
  http::{HeaderMap, Request as HttpRequest, StatusCode, header},
};
use relief_core::{
  Actor, Request, RequestService, RequestStatus,
  memory::MemoryStore,
  request::Urgency,
  store::{RequestFilter, RequestStore},
};
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::api_router;

fn service() -> RequestService<MemoryStore> { RequestService::new(Arc::new(MemoryStore::new())) }

struct Reply {
  status:  StatusCode,
  headers: HeaderMap,
  json:    Value,
}

async fn send<S: RequestStore + 'static>(
  service: &RequestService<S>,
  actor:   Option<Actor>,
  method:  &str,
  uri:     &str,
  headers: Vec<(header::HeaderName, &str)>,
  body:    Option<Value>,
) -> Reply {
  let mut builder = HttpRequest::builder().method(method).uri(uri);
  for (k, v) in headers {
    builder = builder.header(k, v);
  }
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  let mut req = builder.body(body).unwrap();
  if let Some(actor) = actor {
    req.extensions_mut().insert(actor);
  }

  let resp = api_router(service.clone()).oneshot(req).await.unwrap();
  let status = resp.status();
  let headers = resp.headers().clone();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
  Reply { status, headers, json }
}

fn new_request() -> Value {
  json!({
    "kind": "flood",
    "description": "Water rising fast, elderly neighbour",
    "location": "Canal street 4",
    "urgency": "high"
  })
}

async fn create(service: &RequestService<MemoryStore>, requester: Actor) -> Value {
  let reply = send(service, Some(requester), "POST", "/requests", vec![], Some(new_request())).await;
  assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.json);
  reply.json
}

// ── Identity ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_actor_is_401() {
  let svc = service();
  let reply = send(&svc, None, "GET", "/requests/mine", vec![], None).await;
  assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
  assert!(reply.headers.contains_key(header::WWW_AUTHENTICATE));
}

// ── Create ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_returns_201_with_pending_request() {
  let svc = service();
  let requester = Actor::requester(Uuid::new_v4());
  let json = create(&svc, requester).await;
  assert_eq!(json["status"], "pending");
  assert_eq!(json["requester_id"], requester.id.to_string());
  assert_eq!(json["address"], "Canal street 4");
  assert_eq!(json["deletable"], true);
  assert_eq!(json["assigned_responder_id"], Value::Null);
}

#[tokio::test]
async fn create_accepts_legacy_type_field() {
  let svc = service();
  let reply = send(
    &svc,
    Some(Actor::requester(Uuid::new_v4())),
    "POST",
    "/requests",
    vec![],
    Some(json!({
      "type": "earthquake",
      "description": "Cracks through the whole staircase",
      "location": "Mill lane 9"
    })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.json);
  assert_eq!(reply.json["kind"], "earthquake");
}

#[tokio::test]
async fn create_validation_lists_fields() {
  let svc = service();
  let reply = send(
    &svc,
    Some(Actor::requester(Uuid::new_v4())),
    "POST",
    "/requests",
    vec![],
    Some(json!({ "kind": "meteor", "description": "help" })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
  let fields: Vec<&str> = reply.json["fields"]
    .as_array()
    .unwrap()
    .iter()
    .map(|f| f["field"].as_str().unwrap())
    .collect();
  assert_eq!(fields, ["kind", "description", "location"]);
}

#[tokio::test]
async fn create_with_malformed_json_is_400() {
  let svc = service();
  let req = HttpRequest::builder()
    .method("POST")
    .uri("/requests")
    .header(header::CONTENT_TYPE, "application/json")
    .extension(Actor::requester(Uuid::new_v4()))
    .body(Body::from("{not json"))
    .unwrap();
  let resp = api_router(svc).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn responder_cannot_create() {
  let svc = service();
  let reply = send(
    &svc,
    Some(Actor::responder(Uuid::new_v4())),
    "POST",
    "/requests",
    vec![],
    Some(new_request()),
  )
  .await;
  assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

// ── Accept / status ──────────────────────────────────────────────────────────

#[tokio::test]
async fn accept_then_conflict() {
  let svc = service();
  let id = create(&svc, Actor::requester(Uuid::new_v4())).await["id"].as_str().unwrap().to_owned();
  let v1 = Actor::responder(Uuid::new_v4());
  let v2 = Actor::responder(Uuid::new_v4());

  let first = send(&svc, Some(v1), "POST", &format!("/requests/{id}/accept"), vec![], None).await;
  assert_eq!(first.status, StatusCode::OK);
  assert_eq!(first.json["status"], "assigned");
  assert_eq!(first.json["assigned_responder_id"], v1.id.to_string());
  assert!(first.headers.contains_key(header::ETAG));

  let second = send(&svc, Some(v2), "POST", &format!("/requests/{id}/accept"), vec![], None).await;
  assert_eq!(second.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn status_walk_and_invalid_transition() {
  let svc = service();
  let requester = Actor::requester(Uuid::new_v4());
  let responder = Actor::responder(Uuid::new_v4());
  let id = create(&svc, requester).await["id"].as_str().unwrap().to_owned();
  let status_uri = format!("/requests/{id}/status");

  send(&svc, Some(responder), "POST", &format!("/requests/{id}/accept"), vec![], None).await;
  let started = send(
    &svc,
    Some(responder),
    "PATCH",
    &status_uri,
    vec![],
    Some(json!({ "status": "in_progress" })),
  )
  .await;
  assert_eq!(started.status, StatusCode::OK);

  let done = send(
    &svc,
    Some(requester),
    "PATCH",
    &status_uri,
    vec![],
    Some(json!({ "status": "completed" })),
  )
  .await;
  assert_eq!(done.status, StatusCode::OK);
  assert_eq!(done.json["completed_by"], "requester");
  assert_eq!(done.json["deletable"], true);

  let again = send(
    &svc,
    Some(requester),
    "PATCH",
    &status_uri,
    vec![],
    Some(json!({ "status": "cancelled" })),
  )
  .await;
  assert_eq!(again.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn organization_cannot_complete() {
  let svc = service();
  let id = create(&svc, Actor::requester(Uuid::new_v4())).await["id"].as_str().unwrap().to_owned();
  let reply = send(
    &svc,
    Some(Actor::organization(Uuid::new_v4())),
    "PATCH",
    &format!("/requests/{id}/status"),
    vec![],
    Some(json!({ "status": "completed" })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_status_value_is_400() {
  let svc = service();
  let requester = Actor::requester(Uuid::new_v4());
  let id = create(&svc, requester).await["id"].as_str().unwrap().to_owned();
  let reply = send(
    &svc,
    Some(requester),
    "PATCH",
    &format!("/requests/{id}/status"),
    vec![],
    Some(json!({ "status": "resolved" })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stale_if_match_is_412() {
  let svc = service();
  let requester = Actor::requester(Uuid::new_v4());
  let created = send(&svc, Some(requester), "POST", "/requests", vec![], Some(new_request())).await;
  let id = created.json["id"].as_str().unwrap().to_owned();
  let etag = created.headers[header::ETAG].to_str().unwrap().to_owned();

  send(
    &svc,
    Some(Actor::responder(Uuid::new_v4())),
    "POST",
    &format!("/requests/{id}/accept"),
    vec![],
    None,
  )
  .await;

  let reply = send(
    &svc,
    Some(requester),
    "PATCH",
    &format!("/requests/{id}/status"),
    vec![(header::IF_MATCH, etag.as_str())],
    Some(json!({ "status": "cancelled" })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::PRECONDITION_FAILED);

  let fresh = send(&svc, Some(requester), "GET", &format!("/requests/{id}"), vec![], None).await;
  let fresh_etag = fresh.headers[header::ETAG].to_str().unwrap().to_owned();
  let reply = send(
    &svc,
    Some(requester),
    "PATCH",
    &format!("/requests/{id}/status"),
    vec![(header::IF_MATCH, fresh_etag.as_str())],
    Some(json!({ "status": "cancelled" })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::OK);
}

// ── Delete ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn organization_delete_refusal_explains_state() {
  let svc = service();
  let id = create(&svc, Actor::requester(Uuid::new_v4())).await["id"].as_str().unwrap().to_owned();
  send(
    &svc,
    Some(Actor::responder(Uuid::new_v4())),
    "POST",
    &format!("/requests/{id}/accept"),
    vec![],
    None,
  )
  .await;

  let reply = send(
    &svc,
    Some(Actor::organization(Uuid::new_v4())),
    "DELETE",
    &format!("/requests/{id}"),
    vec![],
    None,
  )
  .await;
  assert_eq!(reply.status, StatusCode::FORBIDDEN);
  assert_eq!(reply.json["status"], "assigned");
  assert_eq!(reply.json["deletable"], false);
}

#[tokio::test]
async fn owner_deletes_with_204() {
  let svc = service();
  let requester = Actor::requester(Uuid::new_v4());
  let id = create(&svc, requester).await["id"].as_str().unwrap().to_owned();

  let reply = send(&svc, Some(requester), "DELETE", &format!("/requests/{id}"), vec![], None).await;
  assert_eq!(reply.status, StatusCode::NO_CONTENT);

  let gone = send(&svc, Some(requester), "GET", &format!("/requests/{id}"), vec![], None).await;
  assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn every_delete_refusal_explains_state() {
  let svc = service();
  let owner = Actor::requester(Uuid::new_v4());
  let responder = Actor::responder(Uuid::new_v4());
  let id = create(&svc, owner).await["id"].as_str().unwrap().to_owned();
  let uri = format!("/requests/{id}");
  send(&svc, Some(responder), "POST", &format!("{uri}/accept"), vec![], None).await;
  let etag = send(&svc, Some(owner), "GET", &uri, vec![], None).await.headers[header::ETAG]
    .to_str()
    .unwrap()
    .to_owned();

  let strangers = [responder, Actor::requester(Uuid::new_v4()), Actor::responder(Uuid::new_v4())];
  for actor in strangers {
    for headers in [vec![], vec![(header::IF_MATCH, etag.as_str())], vec![(header::IF_MATCH, "\"old\"")]] {
      let reply = send(&svc, Some(actor), "DELETE", &uri, headers, None).await;
      assert_eq!(reply.status, StatusCode::FORBIDDEN, "{:?}: {}", actor.role, reply.json);
      assert_eq!(reply.json["status"], "assigned");
      assert_eq!(reply.json["deletable"], false);
    }
  }
}

/// Lets one concurrent edit land right after each armed read.
#[derive(Clone)]
struct MeddlingStore {
  inner: MemoryStore,
  armed: Arc<AtomicBool>,
}

impl RequestStore for MeddlingStore {
  type Error = Infallible;

  async fn insert(&self, request: Request) -> Result<Request, Infallible> {
    self.inner.insert(request).await
  }

  async fn get(&self, id: Uuid) -> Result<Option<Request>, Infallible> {
    let found = self.inner.get(id).await?;
    if let Some(read) = &found
      && self.armed.swap(false, Ordering::SeqCst)
    {
      let edited = Request { urgency: Urgency::Low, ..read.clone() };
      self.inner.save(edited, read.version).await?;
    }
    Ok(found)
  }

  async fn save(&self, next: Request, expected: u64) -> Result<Option<Request>, Infallible> {
    self.inner.save(next, expected).await
  }

  async fn delete(&self, id: Uuid, expected: u64) -> Result<bool, Infallible> {
    self.inner.delete(id, expected).await
  }

  async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, Infallible> {
    self.inner.list(filter).await
  }

  async fn count_by_status(&self) -> Result<Vec<(RequestStatus, u64)>, Infallible> {
    self.inner.count_by_status().await
  }
}

#[tokio::test]
async fn if_match_holds_against_writes_racing_the_update() {
  let inner = MemoryStore::new();
  let armed = Arc::new(AtomicBool::new(false));
  let store = MeddlingStore { inner: inner.clone(), armed: armed.clone() };
  let svc = RequestService::new(Arc::new(store));
  let requester = Actor::requester(Uuid::new_v4());

  let created = send(&svc, Some(requester), "POST", "/requests", vec![], Some(new_request())).await;
  let id: Uuid = created.json["id"].as_str().unwrap().parse().unwrap();
  let etag = created.headers[header::ETAG].to_str().unwrap().to_owned();

  armed.store(true, Ordering::SeqCst);
  let reply = send(
    &svc,
    Some(requester),
    "PATCH",
    &format!("/requests/{id}/status"),
    vec![(header::IF_MATCH, etag.as_str())],
    Some(json!({ "status": "cancelled" })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::PRECONDITION_FAILED, "{}", reply.json);

  let stored = inner.get(id).await.unwrap().unwrap();
  assert_eq!(stored.version, 1);
  assert_eq!(stored.status, RequestStatus::Pending);
  assert_eq!(stored.urgency, Urgency::Low);

  armed.store(true, Ordering::SeqCst);
  let reply = send(
    &svc,
    Some(requester),
    "DELETE",
    &format!("/requests/{id}"),
    vec![(header::IF_MATCH, "*")],
    None,
  )
  .await;
  assert_eq!(reply.status, StatusCode::PRECONDITION_FAILED);
  assert!(inner.get(id).await.unwrap().is_some());
}

// ── Reads ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_endpoints_respect_roles() {
  let svc = service();
  let requester = Actor::requester(Uuid::new_v4());
  let responder = Actor::responder(Uuid::new_v4());
  let org = Actor::organization(Uuid::new_v4());
  create(&svc, requester).await;
  let taken = create(&svc, requester).await["id"].as_str().unwrap().to_owned();
  send(&svc, Some(responder), "POST", &format!("/requests/{taken}/accept"), vec![], None).await;

  let mine = send(&svc, Some(requester), "GET", "/requests/mine", vec![], None).await;
  assert_eq!(mine.json.as_array().unwrap().len(), 2);

  let assigned = send(&svc, Some(responder), "GET", "/requests/mine", vec![], None).await;
  assert_eq!(assigned.json.as_array().unwrap().len(), 1);

  let available = send(&svc, Some(responder), "GET", "/requests/available", vec![], None).await;
  assert_eq!(available.json.as_array().unwrap().len(), 1);

  let denied = send(&svc, Some(requester), "GET", "/requests", vec![], None).await;
  assert_eq!(denied.status, StatusCode::FORBIDDEN);

  let filtered =
    send(&svc, Some(org), "GET", "/requests?status=assigned&limit=10", vec![], None).await;
  assert_eq!(filtered.status, StatusCode::OK);
  let rows = filtered.json.as_array().unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0]["id"], taken);
}

#[tokio::test]
async fn stats_for_organizations_only() {
  let svc = service();
  let requester = Actor::requester(Uuid::new_v4());
  create(&svc, requester).await;
  create(&svc, requester).await;

  let reply = send(&svc, Some(Actor::organization(Uuid::new_v4())), "GET", "/stats", vec![], None).await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.json["total"], 2);
  assert_eq!(reply.json["active"], 2);
  assert_eq!(reply.json["by_status"]["pending"], 2);
  assert_eq!(reply.json["by_status"]["completed"], 0);

  let denied = send(&svc, Some(requester), "GET", "/stats", vec![], None).await;
  assert_eq!(denied.status, StatusCode::FORBIDDEN);
}
