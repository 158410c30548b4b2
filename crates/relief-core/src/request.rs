//! The request entity, plus the payload it is created from.
//!
//! A request is only ever mutated through the lifecycle engine
//! ([`crate::lifecycle`]); the fields here are plain data.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::{Error, Result, actor::Role, lifecycle::is_deletable};

/// Minimum length of a trimmed description.
pub const MIN_DESCRIPTION_LEN: usize = 10;

// ─── Enumerations ────────────────────────────────────────────────────────────

/// Lifecycle status. Declaration order follows the lifecycle.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
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
pub enum RequestStatus {
  Pending,
  Assigned,
  InProgress,
  Completed,
  Cancelled,
}

/// How urgent the requester considers the situation. Informational only.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Urgency {
  Low,
  #[default]
  Medium,
  High,
  Critical,
}

/// The kind of disaster the request relates to.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DisasterKind {
  Flood,
  Earthquake,
  Landslide,
  Tsunami,
  Wildfire,
  Cyclone,
  Drought,
  Other,
}

/// A WGS-84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
  pub latitude:  f64,
  pub longitude: f64,
}

impl Coordinates {
  pub fn is_valid(&self) -> bool {
    self.latitude.is_finite()
      && self.longitude.is_finite()
      && (-90.0..=90.0).contains(&self.latitude)
      && (-180.0..=180.0).contains(&self.longitude)
  }
}

// ─── Request ─────────────────────────────────────────────────────────────────

/// An emergency-assistance request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
  pub id:                    Uuid,
  pub requester_id:          Uuid,
  pub assigned_responder_id: Option<Uuid>,
  pub kind:                  DisasterKind,
  pub description:           String,
  pub location:              String,
  pub address:               String,
  pub coordinates:           Option<Coordinates>,
  pub contact_info:          Option<String>,
  pub urgency:               Urgency,
  pub status:                RequestStatus,
  /// First time the request became `assigned`. Never overwritten.
  pub assigned_at:           Option<DateTime<Utc>>,
  /// First time the request became `completed`. Never overwritten.
  pub completed_at:          Option<DateTime<Utc>>,
  /// Role of whoever triggered completion.
  pub completed_by:          Option<Role>,
  /// Derived from `status`; never set directly.
  pub deletable:             bool,
  pub created_at:            DateTime<Utc>,
  pub updated_at:            DateTime<Utc>,
  /// Store revision used for compare-and-swap; bumped by the store on save.
  pub version:               u64,
}

impl Request {
  /// Build a fresh `pending` request from validated details.
  pub fn pending(
    id: Uuid,
    requester_id: Uuid,
    details: RequestDetails,
    now: DateTime<Utc>,
  ) -> Self {
    let status = RequestStatus::Pending;
    Self {
      id,
      requester_id,
      assigned_responder_id: None,
      kind: details.kind,
      description: details.description,
      location: details.location,
      address: details.address,
      coordinates: details.coordinates,
      contact_info: details.contact_info,
      urgency: details.urgency,
      status,
      assigned_at: None,
      completed_at: None,
      completed_by: None,
      deletable: is_deletable(status),
      created_at: now,
      updated_at: now,
      version: 0,
    }
  }

  /// `true` while a responder may still claim this request.
  pub fn is_open(&self) -> bool {
    self.status == RequestStatus::Pending && self.assigned_responder_id.is_none()
  }
}

// ─── Creation payload ────────────────────────────────────────────────────────

/// One rejected field in a creation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
  pub field:   &'static str,
  pub message: String,
}

impl FieldError {
  pub fn new(field: &'static str, message: impl Into<String>) -> Self {
    Self { field, message: message.into() }
  }
}

/// Untrusted input to [`crate::service::RequestService::create_request`].
///
/// Enumerations arrive as strings so an unknown value is reported as a
/// validation failure rather than a deserialisation error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewRequest {
  /// Older clients send this as `type`.
  #[serde(alias = "type")]
  pub kind:         Option<String>,
  pub description:  Option<String>,
  pub location:     Option<String>,
  pub address:      Option<String>,
  pub coordinates:  Option<Coordinates>,
  pub urgency:      Option<String>,
  pub contact_info: Option<String>,
}

/// The validated, normalised form of a [`NewRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDetails {
  pub kind:         DisasterKind,
  pub description:  String,
  pub location:     String,
  pub address:      String,
  pub coordinates:  Option<Coordinates>,
  pub urgency:      Urgency,
  pub contact_info: Option<String>,
}

impl NewRequest {
  /// Check every field and collect all problems at once.
  ///
  /// `location` and `address` fall back to each other, so a request needs
  /// either a location or coordinates together with an address.
  pub fn validate(self) -> Result<RequestDetails> {
    let mut errors = Vec::new();

    let kind = match non_blank(self.kind) {
      None => {
        errors.push(FieldError::new("kind", "disaster type is required"));
        None
      }
      Some(raw) => match DisasterKind::from_str(&raw) {
        Ok(k) => Some(k),
        Err(_) => {
          errors.push(FieldError::new("kind", format!("invalid disaster type: {raw:?}")));
          None
        }
      },
    };

    let description = non_blank(self.description).unwrap_or_default();
    if description.chars().count() < MIN_DESCRIPTION_LEN {
      errors.push(FieldError::new(
        "description",
        format!("description must be at least {MIN_DESCRIPTION_LEN} characters"),
      ));
    }

    let urgency = match non_blank(self.urgency) {
      None => Urgency::default(),
      Some(raw) => Urgency::from_str(&raw).unwrap_or_else(|_| {
        errors.push(FieldError::new("urgency", format!("invalid urgency level: {raw:?}")));
        Urgency::default()
      }),
    };

    if let Some(c) = &self.coordinates
      && !c.is_valid()
    {
      errors.push(FieldError::new("coordinates", "invalid coordinate values"));
    }

    let location = non_blank(self.location);
    let address = non_blank(self.address);
    if location.is_none() && (self.coordinates.is_none() || address.is_none()) {
      errors.push(FieldError::new(
        "location",
        "either location or coordinates with address is required",
      ));
    }

    match kind {
      Some(kind) if errors.is_empty() => {
        let location = location.or_else(|| address.clone()).unwrap_or_default();
        let address = address.unwrap_or_else(|| location.clone());
        Ok(RequestDetails {
          kind,
          description,
          location,
          address,
          coordinates: self.coordinates,
          urgency,
          contact_info: non_blank(self.contact_info),
        })
      }
      _ => Err(Error::Validation(errors)),
    }
  }
}

/// Trim, and treat an all-whitespace string as absent.
fn non_blank(s: Option<String>) -> Option<String> {
  s.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}
