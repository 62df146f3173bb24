//! Batch grading.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/batches` | Body: `{"essay_ids":[...]}`; 202 + snapshot |
//! | `GET`  | `/batches/{id}` | Snapshot with per-item outcomes |
//! | `POST` | `/batches/{id}/pause` | Stops before the next item |
//! | `POST` | `/batches/{id}/resume` | Continues from the next pending item |
//!
//! Batches live in memory. A completed batch stays readable for the
//! registry's retention window (an hour by default) and is dropped the next
//! time a batch is created after that. Each run is a spawned task that
//! grades one essay at a time through [`grading::grade_essay`].

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

use axum::{
  Extension, Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{Duration, Utc};
use rubriq_core::{
  batch::{Batch, BatchSnapshot},
  grade::Grader,
  store::GradingStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, TeacherId, error::ApiError, grading};

// ─── Registry ─────────────────────────────────────────────────────────────────

/// In-memory map of batches by id.
pub struct BatchRegistry {
  batches:   Mutex<HashMap<Uuid, Arc<Batch>>>,
  retention: Duration,
}

impl Default for BatchRegistry {
  fn default() -> Self { Self::with_retention(Duration::hours(1)) }
}

impl BatchRegistry {
  /// A registry that keeps completed batches for `retention`.
  pub fn with_retention(retention: Duration) -> Self {
    Self { batches: Mutex::new(HashMap::new()), retention }
  }

  /// Add `batch`, first dropping batches completed longer ago than the
  /// retention window.
  pub fn insert(&self, batch: Arc<Batch>) {
    let now = Utc::now();
    let mut batches = self.batches.lock().unwrap_or_else(PoisonError::into_inner);
    batches.retain(|_, b| b.completed_at().is_none_or(|t| now - t < self.retention));
    batches.insert(batch.batch_id(), batch);
  }

  pub fn len(&self) -> usize {
    self.batches.lock().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  /// A batch owned by `teacher_id`; other teachers' batches are invisible.
  pub fn get(&self, teacher_id: Uuid, batch_id: Uuid) -> Option<Arc<Batch>> {
    self
      .batches
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&batch_id)
      .filter(|b| b.teacher_id() == teacher_id)
      .cloned()
  }
}

/// Drive `batch` on a background task until it completes or pauses.
fn spawn_run<S, G>(state: &ApiState<S, G>, batch: Arc<Batch>)
where
  S: GradingStore + 'static,
  G: Grader + 'static,
{
  let store = state.store.clone();
  let grader = state.grader.clone();

  tokio::spawn(async move {
    let teacher_id = batch.teacher_id();
    let result = batch
      .run(move |essay_id| {
        let store = store.clone();
        let grader = grader.clone();
        async move {
          grading::grade_essay(&*store, &*grader, teacher_id, essay_id)
            .await
            .map(|_| ())
        }
      })
      .await;

    if let Err(e) = result {
      tracing::warn!(batch_id = %batch.batch_id(), error = %e, "batch run did not start");
    }
  });
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub essay_ids: Vec<Uuid>,
}

/// `POST /batches`: every essay must belong to the teacher.
pub async fn create<S, G>(
  State(state): State<ApiState<S, G>>,
  Extension(TeacherId(teacher_id)): Extension<TeacherId>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: GradingStore + 'static,
  G: Grader + 'static,
{
  if body.essay_ids.is_empty() {
    return Err(ApiError::BadRequest("essay_ids must not be empty".into()));
  }
  for &essay_id in &body.essay_ids {
    if state
      .store
      .get_essay(teacher_id, essay_id)
      .await
      .map_err(ApiError::store)?
      .is_none()
    {
      return Err(ApiError::NotFound(format!("essay {essay_id} not found")));
    }
  }

  let batch = Arc::new(Batch::new(teacher_id, body.essay_ids));
  state.batches.insert(batch.clone());
  let snapshot = batch.snapshot();
  tracing::info!(
    batch_id = %snapshot.batch_id,
    %teacher_id,
    total = snapshot.total,
    "batch created"
  );

  spawn_run(&state, batch);
  Ok((StatusCode::ACCEPTED, Json(snapshot)))
}

fn find<S, G>(state: &ApiState<S, G>, teacher_id: Uuid, id: Uuid) -> Result<Arc<Batch>, ApiError> {
  state
    .batches
    .get(teacher_id, id)
    .ok_or_else(|| ApiError::NotFound(format!("batch {id} not found")))
}

/// `GET /batches/{id}`
pub async fn get_one<S: GradingStore, G: Grader>(
  State(state): State<ApiState<S, G>>,
  Extension(TeacherId(teacher_id)): Extension<TeacherId>,
  Path(id): Path<Uuid>,
) -> Result<Json<BatchSnapshot>, ApiError> {
  Ok(Json(find(&state, teacher_id, id)?.snapshot()))
}

/// `POST /batches/{id}/pause`, 409 once the batch has completed.
pub async fn pause<S: GradingStore, G: Grader>(
  State(state): State<ApiState<S, G>>,
  Extension(TeacherId(teacher_id)): Extension<TeacherId>,
  Path(id): Path<Uuid>,
) -> Result<Json<BatchSnapshot>, ApiError> {
  let batch = find(&state, teacher_id, id)?;
  batch.pause()?;
  tracing::info!(batch_id = %id, "batch pause requested");
  Ok(Json(batch.snapshot()))
}

/// `POST /batches/{id}/resume`, 409 unless paused or pausing.
pub async fn resume<S, G>(
  State(state): State<ApiState<S, G>>,
  Extension(TeacherId(teacher_id)): Extension<TeacherId>,
  Path(id): Path<Uuid>,
) -> Result<Json<BatchSnapshot>, ApiError>
where
  S: GradingStore + 'static,
  G: Grader + 'static,
{
  let batch = find(&state, teacher_id, id)?;
  if batch.resume()? {
    tracing::info!(batch_id = %id, "batch resumed");
    spawn_run(&state, batch.clone());
  }
  Ok(Json(batch.snapshot()))
}

#[cfg(test)]
mod tests {
  use std::convert::Infallible;

  use rubriq_core::batch::BatchState;

  use super::*;

  #[tokio::test]
  async fn completed_batches_are_dropped_after_the_retention_window() {
    let registry = BatchRegistry::with_retention(Duration::zero());
    let teacher = Uuid::new_v4();

    let done = Arc::new(Batch::new(teacher, [Uuid::new_v4()]));
    registry.insert(done.clone());
    let snapshot = done.run(|_| async { Ok::<(), Infallible>(()) }).await.unwrap();
    assert_eq!(snapshot.state, BatchState::Completed);

    let pending = Arc::new(Batch::new(teacher, [Uuid::new_v4()]));
    registry.insert(pending.clone());
    let later = Arc::new(Batch::new(teacher, [Uuid::new_v4()]));
    registry.insert(later.clone());

    assert!(registry.get(teacher, done.batch_id()).is_none());
    assert!(registry.get(teacher, pending.batch_id()).is_some());
    assert!(registry.get(teacher, later.batch_id()).is_some());
    assert_eq!(registry.len(), 2);
  }

  #[tokio::test]
  async fn completed_batches_stay_readable_within_the_window() {
    let registry = BatchRegistry::default();
    let teacher = Uuid::new_v4();

    let done = Arc::new(Batch::new(teacher, [Uuid::new_v4()]));
    registry.insert(done.clone());
    done.run(|_| async { Ok::<(), Infallible>(()) }).await.unwrap();
    registry.insert(Arc::new(Batch::new(teacher, [])));

    assert!(registry.get(teacher, done.batch_id()).is_some());
    assert!(registry.get(Uuid::new_v4(), done.batch_id()).is_none());
  }
}
