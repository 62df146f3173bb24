//! Error types for `rubriq-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid rubric: {0}")]
  InvalidRubric(String),

  #[error("invalid essay: {0}")]
  InvalidEssay(String),

  #[error("invalid student: {0}")]
  InvalidStudent(String),

  #[error("profile not found: {0}")]
  ProfileNotFound(Uuid),

  #[error("rubric not found: {0}")]
  RubricNotFound(Uuid),

  #[error("student not found: {0}")]
  StudentNotFound(Uuid),

  #[error("essay not found: {0}")]
  EssayNotFound(Uuid),

  #[error("batch {0} is already running")]
  BatchAlreadyRunning(Uuid),

  #[error("batch {0} is not paused")]
  BatchNotPaused(Uuid),

  #[error("batch {0} has already completed")]
  BatchCompleted(Uuid),

  #[error("unknown {kind} value: {value:?}")]
  UnknownVariant { kind: &'static str, value: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
