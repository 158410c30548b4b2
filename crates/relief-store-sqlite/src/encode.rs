//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed microsecond width so
//! that `ORDER BY created_at` sorts chronologically. Enumerations use their
//! snake_case names. UUIDs are stored as hyphenated lowercase strings.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use relief_core::{
  Request, RequestStatus, Role,
  request::{Coordinates, DisasterKind, Urgency},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enumerations ────────────────────────────────────────────────────────────

/// Parse a snake_case enum column.
pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::UnknownValue { column, value: s.to_owned() })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawRequest::from_row`].
pub const REQUEST_COLUMNS: &str = "request_id, requester_id, assigned_responder_id, kind, \
   description, location, address, latitude, longitude, contact_info, urgency, status, \
   assigned_at, completed_at, completed_by, deletable, created_at, updated_at, version";

/// Raw values read directly from a `requests` row.
pub struct RawRequest {
  pub request_id:            String,
  pub requester_id:          String,
  pub assigned_responder_id: Option<String>,
  pub kind:                  String,
  pub description:           String,
  pub location:              String,
  pub address:               String,
  pub latitude:              Option<f64>,
  pub longitude:             Option<f64>,
  pub contact_info:          Option<String>,
  pub urgency:               String,
  pub status:                String,
  pub assigned_at:           Option<String>,
  pub completed_at:          Option<String>,
  pub completed_by:          Option<String>,
  pub deletable:             bool,
  pub created_at:            String,
  pub updated_at:            String,
  pub version:               i64,
}

impl RawRequest {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      request_id:            row.get(0)?,
      requester_id:          row.get(1)?,
      assigned_responder_id: row.get(2)?,
      kind:                  row.get(3)?,
      description:           row.get(4)?,
      location:              row.get(5)?,
      address:               row.get(6)?,
      latitude:              row.get(7)?,
      longitude:             row.get(8)?,
      contact_info:          row.get(9)?,
      urgency:               row.get(10)?,
      status:                row.get(11)?,
      assigned_at:           row.get(12)?,
      completed_at:          row.get(13)?,
      completed_by:          row.get(14)?,
      deletable:             row.get(15)?,
      created_at:            row.get(16)?,
      updated_at:            row.get(17)?,
      version:               row.get(18)?,
    })
  }

  pub fn encode(r: &Request) -> Self {
    Self {
      request_id:            encode_uuid(r.id),
      requester_id:          encode_uuid(r.requester_id),
      assigned_responder_id: r.assigned_responder_id.map(encode_uuid),
      kind:                  r.kind.as_ref().to_owned(),
      description:           r.description.clone(),
      location:              r.location.clone(),
      address:               r.address.clone(),
      latitude:              r.coordinates.map(|c| c.latitude),
      longitude:             r.coordinates.map(|c| c.longitude),
      contact_info:          r.contact_info.clone(),
      urgency:               r.urgency.as_ref().to_owned(),
      status:                r.status.as_ref().to_owned(),
      assigned_at:           r.assigned_at.map(encode_dt),
      completed_at:          r.completed_at.map(encode_dt),
      completed_by:          r.completed_by.map(|role| role.as_ref().to_owned()),
      deletable:             r.deletable,
      created_at:            encode_dt(r.created_at),
      updated_at:            encode_dt(r.updated_at),
      version:               r.version as i64,
    }
  }

  pub fn into_request(self) -> Result<Request> {
    let coordinates = match (self.latitude, self.longitude) {
      (Some(latitude), Some(longitude)) => Some(Coordinates { latitude, longitude }),
      _ => None,
    };

    Ok(Request {
      id: decode_uuid(&self.request_id)?,
      requester_id: decode_uuid(&self.requester_id)?,
      assigned_responder_id: self
        .assigned_responder_id
        .as_deref()
        .map(decode_uuid)
        .transpose()?,
      kind: decode_enum::<DisasterKind>("kind", &self.kind)?,
      description: self.description,
      location: self.location,
      address: self.address,
      coordinates,
      contact_info: self.contact_info,
      urgency: decode_enum::<Urgency>("urgency", &self.urgency)?,
      status: decode_enum::<RequestStatus>("status", &self.status)?,
      assigned_at: self.assigned_at.as_deref().map(decode_dt).transpose()?,
      completed_at: self.completed_at.as_deref().map(decode_dt).transpose()?,
      completed_by: self
        .completed_by
        .as_deref()
        .map(|s| decode_enum::<Role>("completed_by", s))
        .transpose()?,
      deletable: self.deletable,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      version: self.version as u64,
    })
  }
}
