//! [`RequestService`], the caller-facing operations.
//!
//! Each write follows the same shape: load the current record, ask the
//! [guard](crate::guard), ask the [lifecycle engine](crate::lifecycle) for the
//! next record, then compare-and-swap it into the store against the version
//! that was read. A lost swap is reported as
//! [`Error::RequestUnavailable`]; nothing is retried here.
//!
//! The `_if` variants take a caller precondition (an HTTP `If-Match`, say)
//! and test it against that same read. A stale precondition, or a swap lost
//! after it held, is reported as [`Error::PreconditionFailed`].

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  Error, Result,
  actor::{Actor, Role},
  clock::{Clock, SystemClock},
  guard, lifecycle,
  request::{FieldError, NewRequest, Request, RequestStatus},
  store::{RequestFilter, RequestStats, RequestStore},
};

/// Input to [`RequestService::change_status`].
#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
  pub status:       RequestStatus,
  /// Recorded completer; only honoured for organizations.
  #[serde(default)]
  pub completed_by: Option<Role>,
  /// Responder to bind when an organization dispatches (`status: assigned`).
  #[serde(default)]
  pub assign_to:    Option<Uuid>,
}

impl StatusChange {
  pub fn to(status: RequestStatus) -> Self {
    Self { status, completed_by: None, assign_to: None }
  }
}

/// Coordinates the guard, the lifecycle engine and a [`RequestStore`].
pub struct RequestService<S, C = SystemClock> {
  store: Arc<S>,
  clock: C,
}

impl<S, C: Clone> Clone for RequestService<S, C> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), clock: self.clock.clone() }
  }
}

impl<S: RequestStore> RequestService<S> {
  pub fn new(store: Arc<S>) -> Self { Self::with_clock(store, SystemClock) }
}

impl<S: RequestStore, C: Clock> RequestService<S, C> {
  pub fn with_clock(store: Arc<S>, clock: C) -> Self { Self { store, clock } }

  pub fn store(&self) -> &Arc<S> { &self.store }

  async fn load(&self, id: Uuid) -> Result<Request> {
    self
      .store
      .get(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(id))
  }

  async fn commit(&self, current: &Request, next: Request) -> Result<Request> {
    self
      .store
      .save(next, current.version)
      .await
      .map_err(Error::store)?
      .ok_or(Error::RequestUnavailable(current.id))
  }

  // ── Writes ────────────────────────────────────────────────────────────

  /// Validate `input` and store it as a new `pending` request owned by
  /// `actor`.
  pub async fn create_request(&self, actor: &Actor, input: NewRequest) -> Result<Request> {
    guard::authorize_create(actor)?;
    let details = input.validate()?;
    let request = Request::pending(Uuid::new_v4(), actor.id, details, self.clock.now());
    let stored = self.store.insert(request).await.map_err(Error::store)?;
    info!(
      request_id = %stored.id,
      requester = %actor.id,
      kind = %stored.kind,
      urgency = %stored.urgency,
      "request created"
    );
    Ok(stored)
  }

  /// A responder claims an open request.
  pub async fn accept_request(&self, actor: &Actor, id: Uuid) -> Result<Request> {
    let current = self.load(id).await?;
    guard::authorize_accept(actor, &current).inspect_err(|e| {
      debug!(request_id = %id, actor = %actor.id, error = %e, "accept refused");
    })?;
    let next = lifecycle::assign(&current, actor.id, actor.role, &self.clock)?;
    let saved = self.commit(&current, next).await.inspect_err(|_| {
      debug!(request_id = %id, actor = %actor.id, "accept lost a concurrent update");
    })?;
    info!(request_id = %id, responder = %actor.id, "request accepted");
    Ok(saved)
  }

  /// Move a request to `change.status` on behalf of `actor`.
  pub async fn change_status(
    &self,
    actor: &Actor,
    id: Uuid,
    change: StatusChange,
  ) -> Result<Request> {
    self.change_status_if(actor, id, change, None::<fn(&Request) -> bool>).await
  }

  /// [`Self::change_status`], provided `precondition` holds for the record
  /// the change is computed from.
  pub async fn change_status_if<P>(
    &self,
    actor: &Actor,
    id: Uuid,
    change: StatusChange,
    precondition: Option<P>,
  ) -> Result<Request>
  where
    P: FnOnce(&Request) -> bool,
  {
    if change.assign_to.is_some() && change.status != RequestStatus::Assigned {
      return Err(Error::Validation(vec![FieldError::new(
        "assign_to",
        "only valid together with status \"assigned\"",
      )]));
    }

    let current = self.load(id).await?;
    guard::authorize_status_change(actor, &current, change.status).inspect_err(|e| {
      debug!(request_id = %id, actor = %actor.id, to = %change.status, error = %e, "status change refused");
    })?;
    let guarded = check_precondition(&current, precondition)?;

    let next = match change.assign_to {
      Some(responder) => {
        guard::authorize_dispatch(actor, &current)?;
        lifecycle::assign(&current, responder, actor.role, &self.clock)?
      }
      None => lifecycle::propose_transition(
        &current,
        change.status,
        actor.role,
        guard::trusted_completed_by(actor, change.completed_by),
        &self.clock,
      )?,
    };

    let saved = self.commit(&current, next).await.map_err(|e| stale(e, guarded))?;
    info!(
      request_id = %id,
      actor = %actor.id,
      role = %actor.role,
      from = %current.status,
      to = %saved.status,
      "request status changed"
    );
    Ok(saved)
  }

  /// Remove a request from the store.
  pub async fn delete_request(&self, actor: &Actor, id: Uuid) -> Result<()> {
    self.delete_request_if(actor, id, None::<fn(&Request) -> bool>).await
  }

  /// [`Self::delete_request`], provided `precondition` holds for the record
  /// being removed.
  pub async fn delete_request_if<P>(
    &self,
    actor: &Actor,
    id: Uuid,
    precondition: Option<P>,
  ) -> Result<()>
  where
    P: FnOnce(&Request) -> bool,
  {
    let current = self.load(id).await?;
    guard::authorize_delete(actor, &current).inspect_err(|e| {
      debug!(request_id = %id, actor = %actor.id, error = %e, "delete refused");
    })?;
    let guarded = check_precondition(&current, precondition)?;
    if !self
      .store
      .delete(id, current.version)
      .await
      .map_err(Error::store)?
    {
      return Err(stale(Error::RequestUnavailable(id), guarded));
    }
    info!(request_id = %id, actor = %actor.id, status = %current.status, "request deleted");
    Ok(())
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn get_request(&self, actor: &Actor, id: Uuid) -> Result<Request> {
    let current = self.load(id).await?;
    guard::authorize_view(actor, &current)?;
    Ok(current)
  }

  /// Requests the actor is party to: created by a requester, assigned to a
  /// responder, or every request for an organization.
  pub async fn list_mine(&self, actor: &Actor) -> Result<Vec<Request>> {
    let filter = match actor.role {
      Role::Requester => RequestFilter { requester_id: Some(actor.id), ..Default::default() },
      Role::Responder => {
        RequestFilter { assigned_responder_id: Some(actor.id), ..Default::default() }
      }
      Role::Organization => RequestFilter::default(),
    };
    self.store.list(&filter).await.map_err(Error::store)
  }

  /// Pending requests no responder has claimed yet.
  pub async fn list_available(&self, actor: &Actor) -> Result<Vec<Request>> {
    guard::authorize_list_open(actor)?;
    self.store.list(&RequestFilter::open()).await.map_err(Error::store)
  }

  pub async fn list_all(&self, actor: &Actor, filter: &RequestFilter) -> Result<Vec<Request>> {
    guard::authorize_list_all(actor)?;
    self.store.list(filter).await.map_err(Error::store)
  }

  pub async fn stats(&self, actor: &Actor) -> Result<RequestStats> {
    guard::authorize_stats(actor)?;
    let counts = self.store.count_by_status().await.map_err(Error::store)?;
    Ok(RequestStats::from_counts(counts))
  }
}

/// Fail with [`Error::PreconditionFailed`] unless `precondition` holds for
/// `current`. Returns whether a precondition was supplied at all.
fn check_precondition<P>(current: &Request, precondition: Option<P>) -> Result<bool>
where
  P: FnOnce(&Request) -> bool,
{
  let Some(holds) = precondition else {
    return Ok(false);
  };
  if holds(current) {
    return Ok(true);
  }
  debug!(request_id = %current.id, version = current.version, "precondition failed");
  Err(Error::PreconditionFailed(current.id))
}

/// A swap lost after the caller's precondition held still invalidates it.
fn stale(e: Error, guarded: bool) -> Error {
  match e {
    Error::RequestUnavailable(id) if guarded => Error::PreconditionFailed(id),
    e => e,
  }
}
