//! `POST /analyze`: grade ad-hoc text without storing an essay or feedback.

use axum::{Extension, Json, extract::State};
use rubriq_core::{feedback::FeedbackDraft, grade::Grader, store::GradingStore};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, TeacherId, error::ApiError, grading};

#[derive(Debug, Deserialize)]
pub struct AnalyzeBody {
  #[serde(default)]
  pub title:     String,
  pub content:   String,
  pub rubric_id: Option<Uuid>,
}

pub async fn handler<S: GradingStore, G: Grader>(
  State(state): State<ApiState<S, G>>,
  Extension(TeacherId(teacher_id)): Extension<TeacherId>,
  Json(body): Json<AnalyzeBody>,
) -> Result<Json<FeedbackDraft>, ApiError> {
  let draft = grading::analyze_text(
    &*state.store,
    &*state.grader,
    teacher_id,
    body.title,
    body.content,
    body.rubric_id,
  )
  .await?;
  Ok(Json(draft))
}
