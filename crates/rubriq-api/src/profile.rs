//! `GET /profile`: the signed-in teacher, their plan and this month's usage.

use axum::{Extension, Json, extract::State};
use rubriq_core::{
  grade::Grader,
  profile::{Profile, Subscription, Usage},
  store::GradingStore,
};
use serde::Serialize;

use crate::{ApiState, TeacherId, error::ApiError, grading};

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
  pub profile:      Profile,
  pub usage:        Usage,
  /// Remaining gradings this month; `None` when unlimited.
  pub remaining:    Option<u32>,
  pub subscription: Option<Subscription>,
}

pub async fn handler<S: GradingStore, G: Grader>(
  State(state): State<ApiState<S, G>>,
  Extension(TeacherId(teacher_id)): Extension<TeacherId>,
) -> Result<Json<ProfileResponse>, ApiError> {
  let (profile, usage) = grading::usage(&*state.store, teacher_id).await?;
  let subscription = state
    .store
    .current_subscription(teacher_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(ProfileResponse {
    profile,
    remaining: usage.remaining(),
    usage,
    subscription,
  }))
}
