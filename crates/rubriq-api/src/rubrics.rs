//! Handlers for `/rubrics` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/rubrics` | Newest first |
//! | `POST`   | `/rubrics` | Body: [`NewRubric`]; validated |
//! | `GET`    | `/rubrics/{id}` | 404 if not found |
//! | `DELETE` | `/rubrics/{id}` | Essays are kept, unlinked |
//! | `POST`   | `/rubrics/{id}/clone` | Body: `{"name":"..."}` (optional); new version |
//! | `POST`   | `/rubrics/import` | Body: CSV or JSON file text; see [`ImportParams`] |

use axum::{
  Extension, Json,
  body::Bytes,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use rubriq_core::{
  grade::Grader,
  rubric::{GradingScale, NewRubric, Rubric, RubricClone},
  store::GradingStore,
};
use rubriq_import::{RubricFormat, SkippedRow, import_rubric};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, TeacherId, error::ApiError};

// ─── List / create ────────────────────────────────────────────────────────────

/// `GET /rubrics`
pub async fn list<S: GradingStore, G: Grader>(
  State(state): State<ApiState<S, G>>,
  Extension(TeacherId(teacher_id)): Extension<TeacherId>,
) -> Result<Json<Vec<Rubric>>, ApiError> {
  let rubrics = state
    .store
    .list_rubrics(teacher_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(rubrics))
}

/// `POST /rubrics` returns 201 + the stored rubric at version 1.
pub async fn create<S: GradingStore, G: Grader>(
  State(state): State<ApiState<S, G>>,
  Extension(TeacherId(teacher_id)): Extension<TeacherId>,
  Json(body): Json<NewRubric>,
) -> Result<impl IntoResponse, ApiError> {
  let body = body.normalized()?;
  let rubric = state
    .store
    .add_rubric(teacher_id, body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(rubric)))
}

// ─── Single rubric ────────────────────────────────────────────────────────────

/// `GET /rubrics/{id}`
pub async fn get_one<S: GradingStore, G: Grader>(
  State(state): State<ApiState<S, G>>,
  Extension(TeacherId(teacher_id)): Extension<TeacherId>,
  Path(id): Path<Uuid>,
) -> Result<Json<Rubric>, ApiError> {
  let rubric = state
    .store
    .get_rubric(teacher_id, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("rubric {id} not found")))?;
  Ok(Json(rubric))
}

/// `DELETE /rubrics/{id}`
pub async fn delete_one<S: GradingStore, G: Grader>(
  State(state): State<ApiState<S, G>>,
  Extension(TeacherId(teacher_id)): Extension<TeacherId>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  if state
    .store
    .delete_rubric(teacher_id, id)
    .await
    .map_err(ApiError::store)?
  {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("rubric {id} not found")))
  }
}

/// `POST /rubrics/{id}/clone`. The body may be empty.
pub async fn clone_one<S: GradingStore, G: Grader>(
  State(state): State<ApiState<S, G>>,
  Extension(TeacherId(teacher_id)): Extension<TeacherId>,
  Path(id): Path<Uuid>,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
  let options: RubricClone = if body.iter().all(u8::is_ascii_whitespace) {
    RubricClone::default()
  } else {
    serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
  };
  let rubric = state
    .store
    .clone_rubric(teacher_id, id, options)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("rubric {id} not found")))?;
  tracing::info!(
    rubric_id = %rubric.rubric_id,
    parent_id = %id,
    version = rubric.version,
    "rubric cloned"
  );
  Ok((StatusCode::CREATED, Json(rubric)))
}

// ─── Import ───────────────────────────────────────────────────────────────────

/// Query parameters for `POST /rubrics/import`. `name` and `subject` override
/// whatever the file carries; `name` is required when the file has none.
#[derive(Debug, Default, Deserialize)]
pub struct ImportParams {
  pub name:          Option<String>,
  pub subject:       Option<String>,
  pub exam_board:    Option<String>,
  pub grading_scale: Option<GradingScale>,
  /// Detected from the body when absent.
  pub format:        Option<RubricFormat>,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
  pub rubric:  Rubric,
  pub skipped: Vec<SkippedRow>,
}

/// `POST /rubrics/import?name=...` returns 201 + the rubric and any rows
/// that were skipped.
pub async fn import<S: GradingStore, G: Grader>(
  State(state): State<ApiState<S, G>>,
  Extension(TeacherId(teacher_id)): Extension<TeacherId>,
  Query(params): Query<ImportParams>,
  body: String,
) -> Result<impl IntoResponse, ApiError> {
  let imported = import_rubric(&body, params.format)?;

  let name = params
    .name
    .filter(|n| !n.trim().is_empty())
    .or(imported.name)
    .ok_or_else(|| ApiError::BadRequest("a rubric name is required".into()))?;

  let input = NewRubric {
    name,
    subject: params.subject.or(imported.subject).unwrap_or_default(),
    exam_board: params.exam_board,
    grading_scale: params.grading_scale.unwrap_or_default(),
    criteria: imported.criteria,
  }
  .normalized()?;

  let rubric = state
    .store
    .add_rubric(teacher_id, input)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(
    rubric_id = %rubric.rubric_id,
    criteria = rubric.criteria.len(),
    skipped = imported.skipped.len(),
    "rubric imported"
  );
  Ok((
    StatusCode::CREATED,
    Json(ImportResponse { rubric, skipped: imported.skipped }),
  ))
}
