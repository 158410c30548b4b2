//! Actors: the verified `(identity, role)` pair behind every call.
//!
//! The core never authenticates anyone. It trusts whatever [`Actor`] the
//! identity layer hands it.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

/// The role an actor plays in the assistance workflow.
///
/// The wire names accept the legacy aliases (`victim`, `volunteer`, `admin`)
/// so older clients keep working.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
  /// Originates assistance requests.
  #[serde(alias = "victim")]
  Requester,
  /// Fulfils requests assigned to them.
  #[serde(alias = "volunteer")]
  Responder,
  /// Dispatch-level authority over every request.
  #[serde(alias = "admin")]
  Organization,
}

/// An authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub id:   Uuid,
  pub role: Role,
}

impl Actor {
  pub fn new(id: Uuid, role: Role) -> Self { Self { id, role } }

  pub fn requester(id: Uuid) -> Self { Self::new(id, Role::Requester) }

  pub fn responder(id: Uuid) -> Self { Self::new(id, Role::Responder) }

  pub fn organization(id: Uuid) -> Self { Self::new(id, Role::Organization) }
}
