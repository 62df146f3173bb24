//! Essays submitted for grading.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

pub const UNTITLED: &str = "Untitled essay";

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EssayStatus {
  #[default]
  Pending,
  Grading,
  Graded,
  Failed,
}

impl EssayStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Grading => "grading",
      Self::Graded => "graded",
      Self::Failed => "failed",
    }
  }
}

impl FromStr for EssayStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "pending" => Ok(Self::Pending),
      "grading" => Ok(Self::Grading),
      "graded" => Ok(Self::Graded),
      "failed" => Ok(Self::Failed),
      other => Err(Error::UnknownVariant {
        kind:  "essay status",
        value: other.to_owned(),
      }),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Essay {
  pub essay_id:   Uuid,
  pub teacher_id: Uuid,
  pub title:      String,
  pub content:    String,
  pub word_count: u32,
  pub rubric_id:  Option<Uuid>,
  pub student_id: Option<Uuid>,
  pub status:     EssayStatus,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::GradingStore::add_essay`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewEssay {
  #[serde(default)]
  pub title:      String,
  pub content:    String,
  pub rubric_id:  Option<Uuid>,
  pub student_id: Option<Uuid>,
}

impl NewEssay {
  /// Blank titles become [`UNTITLED`]; blank content is rejected.
  pub fn normalized(self) -> Result<Self> {
    if self.content.trim().is_empty() {
      return Err(Error::InvalidEssay("content must not be empty".into()));
    }
    let title = match self.title.trim() {
      "" => UNTITLED.to_owned(),
      t => t.to_owned(),
    };
    Ok(Self { title, ..self })
  }
}

/// Whitespace-separated token count.
pub fn word_count(text: &str) -> u32 {
  u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX)
}
