//! The access guard: one decision table for who may do what to a request.
//!
//! | Operation     | requester               | responder                         | organization        |
//! |---------------|-------------------------|-----------------------------------|---------------------|
//! | create        | yes                     | no                                | no                  |
//! | accept        | no                      | if pending and unassigned         | no                  |
//! | change status | own: cancelled/completed | assigned: in_progress/completed  | assigned/cancelled  |
//! | dispatch      | no                      | no                                | if unassigned       |
//! | delete        | own: always             | never                             | if deletable        |
//! | view          | own                     | assigned to them, or still open   | any                 |
//! | list all      | no                      | no                                | yes                 |
//! | list open     | no                      | yes                               | yes                 |
//!
//! Ownership of a request overrides role for delete: whoever created a
//! request may always remove it.
//!
//! The guard says nothing about whether a status change is structurally
//! legal; [`crate::lifecycle`] decides that independently.

use strum::Display;
use thiserror::Error;

use crate::{
  Error, Result,
  actor::{Actor, Role},
  request::{Request, RequestStatus},
};

/// Caller-facing operations the guard rules on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
  Create,
  Accept,
  ChangeStatus,
  Dispatch,
  View,
  ListAll,
  ListOpen,
  Stats,
}

/// Why the guard refused an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Denial {
  #[error("role {role} may not {operation}")]
  RoleNotPermitted { role: Role, operation: Operation },

  #[error("only the requester who created this request may do that")]
  NotRequester,

  #[error("only the responder assigned to this request may do that")]
  NotAssignedResponder,

  #[error("role {role} may not move a request to {target}")]
  TargetNotPermitted { role: Role, target: RequestStatus },

  #[error("role {role} may not delete this request while {status} (deletable: {deletable})")]
  DeleteRefused { role: Role, status: RequestStatus, deletable: bool },

  #[error("request is not visible to this actor")]
  NotVisible,
}

fn require_role(actor: &Actor, role: Role, operation: Operation) -> Result<()> {
  if actor.role == role {
    Ok(())
  } else {
    Err(Denial::RoleNotPermitted { role: actor.role, operation }.into())
  }
}

// ─── Writes ──────────────────────────────────────────────────────────────────

pub fn authorize_create(actor: &Actor) -> Result<()> {
  require_role(actor, Role::Requester, Operation::Create)
}

/// A responder claiming an open request.
pub fn authorize_accept(actor: &Actor, record: &Request) -> Result<()> {
  require_role(actor, Role::Responder, Operation::Accept)?;
  if !record.is_open() {
    return Err(Error::RequestUnavailable(record.id));
  }
  Ok(())
}

/// Pre-check for a general status change towards `target`.
pub fn authorize_status_change(
  actor: &Actor,
  record: &Request,
  target: RequestStatus,
) -> Result<()> {
  use RequestStatus::*;

  let permitted = match actor.role {
    Role::Requester => {
      if record.requester_id != actor.id {
        return Err(Denial::NotRequester.into());
      }
      matches!(target, Cancelled | Completed)
    }
    Role::Responder => {
      if record.assigned_responder_id != Some(actor.id) {
        return Err(Denial::NotAssignedResponder.into());
      }
      matches!(target, InProgress | Completed)
    }
    Role::Organization => matches!(target, Assigned | Cancelled),
  };

  if permitted {
    Ok(())
  } else {
    Err(Denial::TargetNotPermitted { role: actor.role, target }.into())
  }
}

/// An organization binding a request to a named responder.
pub fn authorize_dispatch(actor: &Actor, record: &Request) -> Result<()> {
  require_role(actor, Role::Organization, Operation::Dispatch)?;
  if record.assigned_responder_id.is_some() {
    return Err(Error::RequestUnavailable(record.id));
  }
  Ok(())
}

pub fn authorize_delete(actor: &Actor, record: &Request) -> Result<()> {
  if record.requester_id == actor.id {
    return Ok(());
  }
  if actor.role == Role::Organization && record.deletable {
    return Ok(());
  }
  Err(
    Denial::DeleteRefused {
      role:      actor.role,
      status:    record.status,
      deletable: record.deletable,
    }
    .into(),
  )
}

/// Which completer override, if any, the actor is trusted to supply.
pub fn trusted_completed_by(actor: &Actor, requested: Option<Role>) -> Option<Role> {
  match actor.role {
    Role::Organization => requested,
    _ => None,
  }
}

// ─── Reads ───────────────────────────────────────────────────────────────────

pub fn authorize_view(actor: &Actor, record: &Request) -> Result<()> {
  let visible = match actor.role {
    Role::Requester => record.requester_id == actor.id,
    Role::Responder => {
      record.assigned_responder_id == Some(actor.id) || record.is_open()
    }
    Role::Organization => true,
  };
  if visible { Ok(()) } else { Err(Denial::NotVisible.into()) }
}

pub fn authorize_list_all(actor: &Actor) -> Result<()> {
  require_role(actor, Role::Organization, Operation::ListAll)
}

pub fn authorize_list_open(actor: &Actor) -> Result<()> {
  match actor.role {
    Role::Responder | Role::Organization => Ok(()),
    role => Err(Denial::RoleNotPermitted { role, operation: Operation::ListOpen }.into()),
  }
}

pub fn authorize_stats(actor: &Actor) -> Result<()> {
  require_role(actor, Role::Organization, Operation::Stats)
}
