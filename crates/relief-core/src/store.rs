//! The `RequestStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `relief-store-sqlite`,
//! or [`crate::memory::MemoryStore`]). Higher layers depend on this
//! abstraction, not on any concrete backend.

use std::{collections::BTreeMap, future::Future};

use serde::Serialize;
use strum::IntoEnumIterator as _;
use uuid::Uuid;

use crate::request::{DisasterKind, Request, RequestStatus};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`RequestStore::list`]. Every set field must match.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
  pub requester_id:          Option<Uuid>,
  pub assigned_responder_id: Option<Uuid>,
  pub status:                Option<RequestStatus>,
  pub kind:                  Option<DisasterKind>,
  /// Only requests with no responder bound.
  pub unassigned_only:       bool,
  pub limit:                 Option<usize>,
  pub offset:                Option<usize>,
}

impl RequestFilter {
  /// Requests a responder could still claim.
  pub fn open() -> Self {
    Self {
      status: Some(RequestStatus::Pending),
      unassigned_only: true,
      ..Default::default()
    }
  }

  /// In-process evaluation of the predicate part of the filter (limit and
  /// offset are not considered).
  pub fn matches(&self, r: &Request) -> bool {
    self.requester_id.is_none_or(|id| r.requester_id == id)
      && self
        .assigned_responder_id
        .is_none_or(|id| r.assigned_responder_id == Some(id))
      && self.status.is_none_or(|s| r.status == s)
      && self.kind.is_none_or(|k| r.kind == k)
      && (!self.unassigned_only || r.assigned_responder_id.is_none())
  }
}

// ─── Stats ───────────────────────────────────────────────────────────────────

/// Dashboard counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestStats {
  pub total:     u64,
  /// Pending, assigned or in progress.
  pub active:    u64,
  pub by_status: BTreeMap<RequestStatus, u64>,
}

impl RequestStats {
  /// Fold per-status counts into stats; statuses missing from `counts` are
  /// reported as zero.
  pub fn from_counts(counts: impl IntoIterator<Item = (RequestStatus, u64)>) -> Self {
    let mut by_status: BTreeMap<RequestStatus, u64> =
      RequestStatus::iter().map(|s| (s, 0)).collect();
    for (status, n) in counts {
      *by_status.entry(status).or_default() += n;
    }
    let total = by_status.values().sum();
    let active = by_status
      .iter()
      .filter(|(s, _)| s.is_active())
      .map(|(_, n)| n)
      .sum();
    Self { total, active, by_status }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a request store backend.
///
/// Updates are compare-and-swap on [`Request::version`]: of several writers
/// that read the same version, at most one succeeds.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait RequestStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a newly created request as given.
  fn insert(
    &self,
    request: Request,
  ) -> impl Future<Output = Result<Request, Self::Error>> + Send + '_;

  /// Retrieve a request by id. Returns `None` if not found.
  fn get(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Request>, Self::Error>> + Send + '_;

  /// Replace the stored record with `next` if its version still equals
  /// `expected_version`. The stored (and returned) copy carries
  /// `expected_version + 1`.
  ///
  /// Returns `None` when the record changed underneath the caller or no
  /// longer exists.
  fn save(
    &self,
    next: Request,
    expected_version: u64,
  ) -> impl Future<Output = Result<Option<Request>, Self::Error>> + Send + '_;

  /// Remove a request if its version still equals `expected_version`.
  /// Returns `false` if nothing was removed.
  fn delete(
    &self,
    id: Uuid,
    expected_version: u64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// List requests matching `filter`, newest first.
  fn list<'a>(
    &'a self,
    filter: &'a RequestFilter,
  ) -> impl Future<Output = Result<Vec<Request>, Self::Error>> + Send + 'a;

  /// Number of stored requests per status. Statuses with no requests may be
  /// omitted.
  fn count_by_status(
    &self,
  ) -> impl Future<Output = Result<Vec<(RequestStatus, u64)>, Self::Error>> + Send + '_;
}
