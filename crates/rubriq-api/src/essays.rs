//! Handlers for `/essays` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/essays` | Optional `student_id`, `rubric_id`, `status`, `limit`, `offset` |
//! | `POST`   | `/essays` | Body: [`NewEssay`]; rubric and student must be the teacher's |
//! | `GET`    | `/essays/{id}` | 404 if not found |
//! | `DELETE` | `/essays/{id}` | Feedback goes with it |
//! | `POST`   | `/essays/{id}/grade` | Grade now; returns the feedback |
//! | `GET`    | `/essays/{id}/feedback` | 404 until graded |

use axum::{
  Extension, Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use rubriq_core::{
  essay::{Essay, NewEssay},
  feedback::Feedback,
  grade::Grader,
  store::{EssayQuery, GradingStore},
};
use uuid::Uuid;

use crate::{ApiState, TeacherId, error::ApiError, grading};

/// `GET /essays[?student_id=..][&rubric_id=..][&status=..]`
pub async fn list<S: GradingStore, G: Grader>(
  State(state): State<ApiState<S, G>>,
  Extension(TeacherId(teacher_id)): Extension<TeacherId>,
  Query(query): Query<EssayQuery>,
) -> Result<Json<Vec<Essay>>, ApiError> {
  let essays = state
    .store
    .list_essays(teacher_id, &query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(essays))
}

/// `POST /essays` returns 201 + the stored essay with status `pending`.
pub async fn create<S: GradingStore, G: Grader>(
  State(state): State<ApiState<S, G>>,
  Extension(TeacherId(teacher_id)): Extension<TeacherId>,
  Json(body): Json<NewEssay>,
) -> Result<impl IntoResponse, ApiError> {
  let body = body.normalized()?;

  if let Some(rubric_id) = body.rubric_id
    && state
      .store
      .get_rubric(teacher_id, rubric_id)
      .await
      .map_err(ApiError::store)?
      .is_none()
  {
    return Err(ApiError::NotFound(format!("rubric {rubric_id} not found")));
  }
  if let Some(student_id) = body.student_id
    && state
      .store
      .get_student(teacher_id, student_id)
      .await
      .map_err(ApiError::store)?
      .is_none()
  {
    return Err(ApiError::NotFound(format!("student {student_id} not found")));
  }

  let essay = state
    .store
    .add_essay(teacher_id, body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(essay)))
}

/// `GET /essays/{id}`
pub async fn get_one<S: GradingStore, G: Grader>(
  State(state): State<ApiState<S, G>>,
  Extension(TeacherId(teacher_id)): Extension<TeacherId>,
  Path(id): Path<Uuid>,
) -> Result<Json<Essay>, ApiError> {
  let essay = state
    .store
    .get_essay(teacher_id, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("essay {id} not found")))?;
  Ok(Json(essay))
}

/// `DELETE /essays/{id}`
pub async fn delete_one<S: GradingStore, G: Grader>(
  State(state): State<ApiState<S, G>>,
  Extension(TeacherId(teacher_id)): Extension<TeacherId>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  if state
    .store
    .delete_essay(teacher_id, id)
    .await
    .map_err(ApiError::store)?
  {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("essay {id} not found")))
  }
}

/// `POST /essays/{id}/grade`
pub async fn grade<S: GradingStore, G: Grader>(
  State(state): State<ApiState<S, G>>,
  Extension(TeacherId(teacher_id)): Extension<TeacherId>,
  Path(id): Path<Uuid>,
) -> Result<Json<Feedback>, ApiError> {
  let feedback = grading::grade_essay(&*state.store, &*state.grader, teacher_id, id).await?;
  Ok(Json(feedback))
}

/// `GET /essays/{id}/feedback`
pub async fn feedback<S: GradingStore, G: Grader>(
  State(state): State<ApiState<S, G>>,
  Extension(TeacherId(teacher_id)): Extension<TeacherId>,
  Path(id): Path<Uuid>,
) -> Result<Json<Feedback>, ApiError> {
  let feedback = state
    .store
    .get_feedback(teacher_id, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("no feedback for essay {id}")))?;
  Ok(Json(feedback))
}
