//! The grading service shared by `/essays/{id}/grade`, `/analyze` and the
//! batch runner.
//!
//! Every grading is metered: the teacher's usage this calendar month is
//! checked against their plan before the grader is called, and a usage row
//! is recorded after a successful grading.

use chrono::Utc;
use rubriq_core::{
  essay::EssayStatus,
  feedback::{Feedback, FeedbackDraft},
  grade::{Grader, GradingRequest},
  profile::{Profile, Usage, month_start},
  rubric::Rubric,
  store::GradingStore,
};
use uuid::Uuid;

use crate::error::ApiError;

/// Load the teacher's profile and this month's usage.
pub async fn usage<S: GradingStore>(
  store: &S,
  teacher_id: Uuid,
) -> Result<(Profile, Usage), ApiError> {
  let profile = store
    .get_profile(teacher_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("profile {teacher_id} not found")))?;

  let period_start = month_start(Utc::now());
  let used = store
    .count_usage_since(teacher_id, period_start)
    .await
    .map_err(ApiError::store)?;

  let usage = Usage {
    plan: profile.plan,
    used,
    allowance: profile.plan.monthly_allowance(),
    period_start,
  };
  Ok((profile, usage))
}

/// Fail with [`ApiError::QuotaExceeded`] when the allowance is used up.
pub async fn ensure_allowance<S: GradingStore>(
  store: &S,
  teacher_id: Uuid,
) -> Result<Usage, ApiError> {
  let (_, usage) = usage(store, teacher_id).await?;
  match usage.allowance {
    Some(allowance) if usage.is_exhausted() => {
      tracing::info!(%teacher_id, plan = usage.plan.as_str(), allowance, "grading allowance exhausted");
      Err(ApiError::QuotaExceeded { plan: usage.plan, allowance })
    }
    _ => Ok(usage),
  }
}

async fn load_rubric<S: GradingStore>(
  store: &S,
  teacher_id: Uuid,
  rubric_id: Option<Uuid>,
) -> Result<Option<Rubric>, ApiError> {
  let Some(rubric_id) = rubric_id else {
    return Ok(None);
  };
  store
    .get_rubric(teacher_id, rubric_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("rubric {rubric_id} not found")))
    .map(Some)
}

/// Grade a stored essay and replace its feedback.
///
/// The essay is `grading` while the grader runs, then `graded` or `failed`.
pub async fn grade_essay<S: GradingStore, G: Grader>(
  store: &S,
  grader: &G,
  teacher_id: Uuid,
  essay_id: Uuid,
) -> Result<Feedback, ApiError> {
  ensure_allowance(store, teacher_id).await?;

  let essay = store
    .get_essay(teacher_id, essay_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("essay {essay_id} not found")))?;

  let rubric = load_rubric(store, teacher_id, essay.rubric_id).await?;

  store
    .set_essay_status(teacher_id, essay_id, EssayStatus::Grading)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(%essay_id, %teacher_id, words = essay.word_count, "grading essay");

  let request = GradingRequest { title: essay.title, content: essay.content, rubric };
  let draft = match grader.grade(request).await {
    Ok(draft) => draft,
    Err(e) => {
      tracing::warn!(%essay_id, error = %e, "grading failed");
      store
        .set_essay_status(teacher_id, essay_id, EssayStatus::Failed)
        .await
        .map_err(ApiError::store)?;
      return Err(ApiError::Grading(e.to_string()));
    }
  };

  let saved = async {
    let feedback = store
      .save_feedback(teacher_id, essay_id, draft)
      .await
      .map_err(ApiError::store)?;
    store
      .set_essay_status(teacher_id, essay_id, EssayStatus::Graded)
      .await
      .map_err(ApiError::store)?;
    Ok::<_, ApiError>(feedback)
  }
  .await;
  let feedback = match saved {
    Ok(feedback) => feedback,
    Err(e) => {
      tracing::warn!(%essay_id, error = %e, "failed to store feedback");
      if let Err(status_err) = store
        .set_essay_status(teacher_id, essay_id, EssayStatus::Failed)
        .await
      {
        tracing::warn!(%essay_id, error = %status_err, "failed to mark essay as failed");
      }
      return Err(e);
    }
  };
  store
    .record_usage(teacher_id, Some(essay_id))
    .await
    .map_err(ApiError::store)?;

  tracing::info!(
    %essay_id,
    score = feedback.draft.score.map(|s| s.percentage()),
    band = feedback.draft.band,
    "essay graded"
  );
  Ok(feedback)
}

/// Grade text that is not stored as an essay. Usage is still recorded.
pub async fn analyze_text<S: GradingStore, G: Grader>(
  store: &S,
  grader: &G,
  teacher_id: Uuid,
  title: String,
  content: String,
  rubric_id: Option<Uuid>,
) -> Result<FeedbackDraft, ApiError> {
  if content.trim().is_empty() {
    return Err(ApiError::BadRequest("content must not be empty".into()));
  }
  ensure_allowance(store, teacher_id).await?;
  let rubric = load_rubric(store, teacher_id, rubric_id).await?;

  let request = GradingRequest { title, content, rubric };
  tracing::info!(%teacher_id, words = request.word_count(), "analyzing text");
  let draft = grader.grade(request).await.map_err(|e| {
    tracing::warn!(error = %e, "analysis failed");
    ApiError::Grading(e.to_string())
  })?;

  store
    .record_usage(teacher_id, None)
    .await
    .map_err(ApiError::store)?;
  Ok(draft)
}
