//! [`SqliteStore`], the SQLite implementation of [`RequestStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use tracing::debug;
use uuid::Uuid;

use relief_core::{
  Request, RequestStatus,
  store::{RequestFilter, RequestStore},
};

use crate::{
  Error, Result,
  encode::{REQUEST_COLUMNS, RawRequest, decode_enum, encode_uuid},
  schema::{SCHEMA, VERSION},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Relief request store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Every call
/// runs on the connection's own thread, one at a time, so each statement
/// below is atomic with respect to other callers.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let found: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("PRAGMA user_version", [], |r| r.get(0))?))
      .await?;
    if found > VERSION {
      return Err(Error::SchemaVersion { found, supported: VERSION });
    }

    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    debug!(from = found, to = VERSION, "schema ready");
    Ok(())
  }
}

// ─── RequestStore impl ───────────────────────────────────────────────────────

impl RequestStore for SqliteStore {
  type Error = Error;

  async fn insert(&self, request: Request) -> Result<Request> {
    let raw = RawRequest::encode(&request);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO requests ({REQUEST_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                     ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"
          ),
          rusqlite::params![
            raw.request_id,
            raw.requester_id,
            raw.assigned_responder_id,
            raw.kind,
            raw.description,
            raw.location,
            raw.address,
            raw.latitude,
            raw.longitude,
            raw.contact_info,
            raw.urgency,
            raw.status,
            raw.assigned_at,
            raw.completed_at,
            raw.completed_by,
            raw.deletable,
            raw.created_at,
            raw.updated_at,
            raw.version,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(request)
  }

  async fn get(&self, id: Uuid) -> Result<Option<Request>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawRequest> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE request_id = ?1"),
              rusqlite::params![id_str],
              RawRequest::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRequest::into_request).transpose()
  }

  async fn save(&self, next: Request, expected_version: u64) -> Result<Option<Request>> {
    let next = Request { version: expected_version + 1, ..next };
    let raw = RawRequest::encode(&next);
    let expected = expected_version as i64;

    // The identity, owner and creation time are immutable; everything else
    // is rewritten under the version check.
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE requests SET
             assigned_responder_id = ?2,
             status                = ?3,
             assigned_at           = ?4,
             completed_at          = ?5,
             completed_by          = ?6,
             deletable             = ?7,
             updated_at            = ?8,
             version               = ?9
           WHERE request_id = ?1 AND version = ?10",
          rusqlite::params![
            raw.request_id,
            raw.assigned_responder_id,
            raw.status,
            raw.assigned_at,
            raw.completed_at,
            raw.completed_by,
            raw.deletable,
            raw.updated_at,
            raw.version,
            expected,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      debug!(request_id = %next.id, expected_version, "version check failed");
      return Ok(None);
    }
    Ok(Some(next))
  }

  async fn delete(&self, id: Uuid, expected_version: u64) -> Result<bool> {
    let id_str = encode_uuid(id);
    let expected = expected_version as i64;

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM requests WHERE request_id = ?1 AND version = ?2",
          rusqlite::params![id_str, expected],
        )?)
      })
      .await?;

    Ok(removed > 0)
  }

  async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>> {
    let requester_str = filter.requester_id.map(encode_uuid);
    let responder_str = filter.assigned_responder_id.map(encode_uuid);
    let status_str = filter.status.map(|s| s.as_ref().to_owned());
    let kind_str = filter.kind.map(|k| k.as_ref().to_owned());
    let unassigned_only = filter.unassigned_only;
    // SQLite treats a negative LIMIT as "no limit".
    let limit_val = filter.limit.map_or(-1, |l| l as i64);
    let offset_val = filter.offset.unwrap_or(0) as i64;

    let raws: Vec<RawRequest> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REQUEST_COLUMNS}
           FROM requests
           WHERE (?1 IS NULL OR requester_id          = ?1)
             AND (?2 IS NULL OR assigned_responder_id = ?2)
             AND (?3 IS NULL OR status                = ?3)
             AND (?4 IS NULL OR kind                  = ?4)
             AND (NOT ?5 OR assigned_responder_id IS NULL)
           ORDER BY created_at DESC, rowid DESC
           LIMIT ?6 OFFSET ?7"
        ))?;

        let rows = stmt
          .query_map(
            rusqlite::params![
              requester_str,
              responder_str,
              status_str,
              kind_str,
              unassigned_only,
              limit_val,
              offset_val,
            ],
            RawRequest::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRequest::into_request).collect()
  }

  async fn count_by_status(&self) -> Result<Vec<(RequestStatus, u64)>> {
    let rows: Vec<(String, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT status, COUNT(*) FROM requests GROUP BY status")?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(status, n)| -> Result<(RequestStatus, u64)> {
        Ok((decode_enum("status", &status)?, n as u64))
      })
      .collect()
  }
}
