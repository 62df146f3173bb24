//! Handlers for `/students` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/students` | Ordered by name |
//! | `POST`   | `/students` | Body: `{"name":"...","class_name":"10B"}` |
//! | `GET`    | `/students/{id}` | 404 if not found |
//! | `DELETE` | `/students/{id}` | Essays are kept, unlinked |

use axum::{
  Extension, Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use rubriq_core::{
  grade::Grader,
  store::GradingStore,
  student::{NewStudent, Student},
};
use uuid::Uuid;

use crate::{ApiState, TeacherId, error::ApiError};

/// `GET /students`
pub async fn list<S: GradingStore, G: Grader>(
  State(state): State<ApiState<S, G>>,
  Extension(TeacherId(teacher_id)): Extension<TeacherId>,
) -> Result<Json<Vec<Student>>, ApiError> {
  let students = state
    .store
    .list_students(teacher_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(students))
}

/// `POST /students`
pub async fn create<S: GradingStore, G: Grader>(
  State(state): State<ApiState<S, G>>,
  Extension(TeacherId(teacher_id)): Extension<TeacherId>,
  Json(body): Json<NewStudent>,
) -> Result<impl IntoResponse, ApiError> {
  let body = body.normalized()?;
  let student = state
    .store
    .add_student(teacher_id, body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(student)))
}

/// `GET /students/{id}`
pub async fn get_one<S: GradingStore, G: Grader>(
  State(state): State<ApiState<S, G>>,
  Extension(TeacherId(teacher_id)): Extension<TeacherId>,
  Path(id): Path<Uuid>,
) -> Result<Json<Student>, ApiError> {
  let student = state
    .store
    .get_student(teacher_id, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("student {id} not found")))?;
  Ok(Json(student))
}

/// `DELETE /students/{id}`
pub async fn delete_one<S: GradingStore, G: Grader>(
  State(state): State<ApiState<S, G>>,
  Extension(TeacherId(teacher_id)): Extension<TeacherId>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  if state
    .store
    .delete_student(teacher_id, id)
    .await
    .map_err(ApiError::store)?
  {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("student {id} not found")))
  }
}
