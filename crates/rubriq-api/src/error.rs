//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use rubriq_core::profile::Plan;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("the {} plan allows {allowance} gradings per month", .plan.as_str())]
  QuotaExceeded { plan: Plan, allowance: u32 },

  #[error("grading failed: {0}")]
  Grading(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Wrap a store error, surfacing any [`rubriq_core::Error`] in its source
  /// chain as the same response the core error gets on its own.
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    let core = std::iter::successors(
      Some(&e as &(dyn std::error::Error + 'static)),
      |err| err.source(),
    )
    .find_map(|err| err.downcast_ref::<rubriq_core::Error>());
    match core.and_then(Self::classify) {
      Some(mapped) => mapped,
      None => Self::Store(Box::new(e)),
    }
  }

  fn classify(e: &rubriq_core::Error) -> Option<Self> {
    use rubriq_core::Error as E;
    match e {
      E::ProfileNotFound(_) | E::RubricNotFound(_) | E::StudentNotFound(_) | E::EssayNotFound(_) => {
        Some(Self::NotFound(e.to_string()))
      }
      E::InvalidRubric(_) | E::InvalidEssay(_) | E::InvalidStudent(_) | E::UnknownVariant { .. } => {
        Some(Self::BadRequest(e.to_string()))
      }
      E::BatchAlreadyRunning(_) | E::BatchNotPaused(_) | E::BatchCompleted(_) => {
        Some(Self::Conflict(e.to_string()))
      }
      E::Serialization(_) => None,
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Conflict(_) => StatusCode::CONFLICT,
      Self::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
      Self::Grading(_) => StatusCode::BAD_GATEWAY,
      Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<rubriq_core::Error> for ApiError {
  fn from(e: rubriq_core::Error) -> Self {
    Self::classify(&e).unwrap_or_else(|| Self::Store(Box::new(e)))
  }
}

impl From<rubriq_import::Error> for ApiError {
  fn from(e: rubriq_import::Error) -> Self { Self::BadRequest(e.to_string()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self {
      Self::NotFound(m) | Self::BadRequest(m) | Self::Conflict(m) | Self::Grading(m) => m.clone(),
      Self::QuotaExceeded { .. } => self.to_string(),
      Self::Store(e) => {
        tracing::error!(error = %e, "store error");
        e.to_string()
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
