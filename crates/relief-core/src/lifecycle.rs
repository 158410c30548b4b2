//! The request lifecycle engine.
//!
//! ```text
//! pending      -> assigned | cancelled
//! assigned     -> in_progress | cancelled
//! in_progress  -> completed | cancelled
//! completed    -> (terminal)
//! cancelled    -> (terminal)
//! ```
//!
//! Every accepted transition yields a complete next record. Nothing here
//! touches storage; the caller persists the result.

use uuid::Uuid;

use crate::{
  Error, Result,
  actor::Role,
  clock::Clock,
  request::{Request, RequestStatus},
};

// ─── Transition graph ────────────────────────────────────────────────────────

impl RequestStatus {
  /// Statuses directly reachable from `self`.
  pub fn successors(self) -> &'static [RequestStatus] {
    use RequestStatus::*;
    match self {
      Pending => &[Assigned, Cancelled],
      Assigned => &[InProgress, Cancelled],
      InProgress => &[Completed, Cancelled],
      Completed | Cancelled => &[],
    }
  }

  pub fn can_transition_to(self, next: RequestStatus) -> bool {
    self.successors().contains(&next)
  }

  pub fn is_terminal(self) -> bool { self.successors().is_empty() }

  /// Pending, assigned or in progress.
  pub fn is_active(self) -> bool { !self.is_terminal() }
}

/// Whether a request in `status` may be removed by someone other than its
/// requester.
pub fn is_deletable(status: RequestStatus) -> bool {
  matches!(
    status,
    RequestStatus::Pending | RequestStatus::Completed | RequestStatus::Cancelled
  )
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// Validate a status change and compute the record that results from it.
///
/// `completed_by_override` replaces `acting_role` as the recorded completer
/// when present; only meaningful when `target` is `completed`.
pub fn propose_transition(
  record: &Request,
  target: RequestStatus,
  acting_role: Role,
  completed_by_override: Option<Role>,
  clock: &impl Clock,
) -> Result<Request> {
  if !record.status.can_transition_to(target) {
    return Err(Error::InvalidTransition { from: record.status, to: target });
  }

  let now = clock.now();
  let mut next = record.clone();
  next.status = target;
  next.updated_at = now;
  next.deletable = is_deletable(target);

  // First write wins for both timestamps, even on a retried call.
  if target == RequestStatus::Assigned && next.assigned_at.is_none() {
    next.assigned_at = Some(now);
  }
  if target == RequestStatus::Completed && next.completed_at.is_none() {
    next.completed_at = Some(now);
    next.completed_by = Some(completed_by_override.unwrap_or(acting_role));
  }

  Ok(next)
}

/// Move a record to `assigned` and bind it to `responder_id`.
///
/// Used both by a responder claiming a request and by an organization
/// dispatching one. The caller is expected to have checked that no responder
/// is bound yet.
pub fn assign(
  record: &Request,
  responder_id: Uuid,
  acting_role: Role,
  clock: &impl Clock,
) -> Result<Request> {
  let mut next =
    propose_transition(record, RequestStatus::Assigned, acting_role, None, clock)?;
  next.assigned_responder_id = Some(responder_id);
  Ok(next)
}
