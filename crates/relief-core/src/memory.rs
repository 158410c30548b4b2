//! An in-process [`RequestStore`], for tests and single-node demos.

use std::{
  convert::Infallible,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use uuid::Uuid;

use crate::{
  request::{Request, RequestStatus},
  store::{RequestFilter, RequestStore},
};

/// Requests held in insertion order behind a mutex.
///
/// The lock is taken once per call and never held across an `.await`, which
/// makes each call, including the version check in [`RequestStore::save`],
/// atomic with respect to other callers.
///
/// Cloning is cheap; clones share the same data.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
  requests: Arc<Mutex<Vec<Request>>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn lock(&self) -> MutexGuard<'_, Vec<Request>> {
    // A panic mid-update cannot leave a half-written record: every mutation
    // is a single assignment or removal.
    self.requests.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl RequestStore for MemoryStore {
  type Error = Infallible;

  async fn insert(&self, request: Request) -> Result<Request, Infallible> {
    self.lock().push(request.clone());
    Ok(request)
  }

  async fn get(&self, id: Uuid) -> Result<Option<Request>, Infallible> {
    Ok(self.lock().iter().find(|r| r.id == id).cloned())
  }

  async fn save(
    &self,
    next: Request,
    expected_version: u64,
  ) -> Result<Option<Request>, Infallible> {
    let mut requests = self.lock();
    let Some(slot) = requests
      .iter_mut()
      .find(|r| r.id == next.id && r.version == expected_version)
    else {
      return Ok(None);
    };
    *slot = Request { version: expected_version + 1, ..next };
    Ok(Some(slot.clone()))
  }

  async fn delete(&self, id: Uuid, expected_version: u64) -> Result<bool, Infallible> {
    let mut requests = self.lock();
    match requests
      .iter()
      .position(|r| r.id == id && r.version == expected_version)
    {
      Some(i) => {
        requests.remove(i);
        Ok(true)
      }
      None => Ok(false),
    }
  }

  async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, Infallible> {
    let requests = self.lock();
    let mut matching: Vec<Request> =
      requests.iter().rev().filter(|r| filter.matches(r)).cloned().collect();
    // Newest first; ties keep reverse insertion order (the sort is stable).
    matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(
      matching
        .into_iter()
        .skip(filter.offset.unwrap_or(0))
        .take(filter.limit.unwrap_or(usize::MAX))
        .collect(),
    )
  }

  async fn count_by_status(&self) -> Result<Vec<(RequestStatus, u64)>, Infallible> {
    let requests = self.lock();
    let mut counts: Vec<(RequestStatus, u64)> = Vec::new();
    for r in requests.iter() {
      match counts.iter_mut().find(|(s, _)| *s == r.status) {
        Some((_, n)) => *n += 1,
        None => counts.push((r.status, 1)),
      }
    }
    Ok(counts)
  }
}
