//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. String lists and criteria
//! are stored as compact JSON. UUIDs are stored as hyphenated lowercase
//! strings.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rubriq_core::{
  essay::{Essay, EssayStatus},
  feedback::{CriterionScore, Feedback, FeedbackDraft, Score},
  profile::{Plan, Profile, Subscription, SubscriptionStatus},
  rubric::{Criterion, GradingScale, Rubric},
  student::Student,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Enums are stored by their `as_str` name and parsed back with `FromStr`.
fn decode_enum<T>(s: &str) -> Result<T>
where
  T: FromStr<Err = rubriq_core::Error>,
{
  Ok(s.parse()?)
}

fn to_u32(v: i64) -> u32 { u32::try_from(v).unwrap_or_default() }

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_strings(items: &[String]) -> Result<String> {
  Ok(serde_json::to_string(items)?)
}

fn decode_strings(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

pub fn encode_criteria(criteria: &[Criterion]) -> Result<String> {
  Ok(serde_json::to_string(criteria)?)
}

pub fn encode_criterion_scores(scores: &[CriterionScore]) -> Result<String> {
  Ok(serde_json::to_string(scores)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const PROFILE_COLUMNS: &str =
  "profile_id, email, display_name, plan, created_at";

/// Raw strings read directly from a `profiles` row.
pub struct RawProfile {
  pub profile_id:   String,
  pub email:        String,
  pub display_name: String,
  pub plan:         String,
  pub created_at:   String,
}

impl RawProfile {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      profile_id:   row.get(0)?,
      email:        row.get(1)?,
      display_name: row.get(2)?,
      plan:         row.get(3)?,
      created_at:   row.get(4)?,
    })
  }

  pub fn into_profile(self) -> Result<Profile> {
    Ok(Profile {
      profile_id:   decode_uuid(&self.profile_id)?,
      email:        self.email,
      display_name: self.display_name,
      plan:         decode_enum::<Plan>(&self.plan)?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub const SUBSCRIPTION_COLUMNS: &str = "subscription_id, profile_id, plan, \
  status, external_ref, current_period_end, recorded_at";

pub struct RawSubscription {
  pub subscription_id:    String,
  pub profile_id:         String,
  pub plan:               String,
  pub status:             String,
  pub external_ref:       Option<String>,
  pub current_period_end: Option<String>,
  pub recorded_at:        String,
}

impl RawSubscription {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subscription_id:    row.get(0)?,
      profile_id:         row.get(1)?,
      plan:               row.get(2)?,
      status:             row.get(3)?,
      external_ref:       row.get(4)?,
      current_period_end: row.get(5)?,
      recorded_at:        row.get(6)?,
    })
  }

  pub fn into_subscription(self) -> Result<Subscription> {
    Ok(Subscription {
      subscription_id:    decode_uuid(&self.subscription_id)?,
      profile_id:         decode_uuid(&self.profile_id)?,
      plan:               decode_enum::<Plan>(&self.plan)?,
      status:             decode_enum::<SubscriptionStatus>(&self.status)?,
      external_ref:       self.external_ref,
      current_period_end: self
        .current_period_end
        .as_deref()
        .map(decode_dt)
        .transpose()?,
      recorded_at:        decode_dt(&self.recorded_at)?,
    })
  }
}

pub const STUDENT_COLUMNS: &str =
  "student_id, teacher_id, name, class_name, created_at";

pub struct RawStudent {
  pub student_id: String,
  pub teacher_id: String,
  pub name:       String,
  pub class_name: Option<String>,
  pub created_at: String,
}

impl RawStudent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      student_id: row.get(0)?,
      teacher_id: row.get(1)?,
      name:       row.get(2)?,
      class_name: row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      student_id: decode_uuid(&self.student_id)?,
      teacher_id: decode_uuid(&self.teacher_id)?,
      name:       self.name,
      class_name: self.class_name,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const RUBRIC_COLUMNS: &str = "rubric_id, teacher_id, name, subject, \
  exam_board, grading_scale, criteria_json, version, parent_id, created_at";

pub struct RawRubric {
  pub rubric_id:     String,
  pub teacher_id:    String,
  pub name:          String,
  pub subject:       String,
  pub exam_board:    Option<String>,
  pub grading_scale: String,
  pub criteria_json: String,
  pub version:       i64,
  pub parent_id:     Option<String>,
  pub created_at:    String,
}

impl RawRubric {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      rubric_id:     row.get(0)?,
      teacher_id:    row.get(1)?,
      name:          row.get(2)?,
      subject:       row.get(3)?,
      exam_board:    row.get(4)?,
      grading_scale: row.get(5)?,
      criteria_json: row.get(6)?,
      version:       row.get(7)?,
      parent_id:     row.get(8)?,
      created_at:    row.get(9)?,
    })
  }

  pub fn into_rubric(self) -> Result<Rubric> {
    Ok(Rubric {
      rubric_id:     decode_uuid(&self.rubric_id)?,
      teacher_id:    decode_uuid(&self.teacher_id)?,
      name:          self.name,
      subject:       self.subject,
      exam_board:    self.exam_board,
      grading_scale: decode_enum::<GradingScale>(&self.grading_scale)?,
      criteria:      serde_json::from_str(&self.criteria_json)?,
      version:       to_u32(self.version),
      parent_id:     decode_opt_uuid(self.parent_id)?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub const ESSAY_COLUMNS: &str = "essay_id, teacher_id, title, content, \
  word_count, rubric_id, student_id, status, created_at";

pub struct RawEssay {
  pub essay_id:   String,
  pub teacher_id: String,
  pub title:      String,
  pub content:    String,
  pub word_count: i64,
  pub rubric_id:  Option<String>,
  pub student_id: Option<String>,
  pub status:     String,
  pub created_at: String,
}

impl RawEssay {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      essay_id:   row.get(0)?,
      teacher_id: row.get(1)?,
      title:      row.get(2)?,
      content:    row.get(3)?,
      word_count: row.get(4)?,
      rubric_id:  row.get(5)?,
      student_id: row.get(6)?,
      status:     row.get(7)?,
      created_at: row.get(8)?,
    })
  }

  pub fn into_essay(self) -> Result<Essay> {
    Ok(Essay {
      essay_id:   decode_uuid(&self.essay_id)?,
      teacher_id: decode_uuid(&self.teacher_id)?,
      title:      self.title,
      content:    self.content,
      word_count: to_u32(self.word_count),
      rubric_id:  decode_opt_uuid(self.rubric_id)?,
      student_id: decode_opt_uuid(self.student_id)?,
      status:     decode_enum::<EssayStatus>(&self.status)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Columns prefixed with the `f` alias used by the feedback/essay join.
pub const FEEDBACK_COLUMNS: &str = "f.feedback_id, f.essay_id, f.summary, \
  f.strengths_json, f.improvements_json, f.grammar_issues_json, \
  f.score_awarded, f.score_out_of, f.criterion_scores_json, f.band, f.model, \
  f.raw_text, f.created_at";

pub struct RawFeedback {
  pub feedback_id:           String,
  pub essay_id:              String,
  pub summary:               String,
  pub strengths_json:        String,
  pub improvements_json:     String,
  pub grammar_issues_json:   String,
  pub score_awarded:         Option<f64>,
  pub score_out_of:          Option<f64>,
  pub criterion_scores_json: String,
  pub band:                  Option<i64>,
  pub model:                 String,
  pub raw_text:              String,
  pub created_at:            String,
}

impl RawFeedback {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      feedback_id:           row.get(0)?,
      essay_id:              row.get(1)?,
      summary:               row.get(2)?,
      strengths_json:        row.get(3)?,
      improvements_json:     row.get(4)?,
      grammar_issues_json:   row.get(5)?,
      score_awarded:         row.get(6)?,
      score_out_of:          row.get(7)?,
      criterion_scores_json: row.get(8)?,
      band:                  row.get(9)?,
      model:                 row.get(10)?,
      raw_text:              row.get(11)?,
      created_at:            row.get(12)?,
    })
  }

  pub fn into_feedback(self) -> Result<Feedback> {
    let score = match (self.score_awarded, self.score_out_of) {
      (Some(awarded), Some(out_of)) => Score::clamped(awarded, out_of),
      _ => None,
    };

    Ok(Feedback {
      feedback_id: decode_uuid(&self.feedback_id)?,
      essay_id:    decode_uuid(&self.essay_id)?,
      draft:       FeedbackDraft {
        summary:          self.summary,
        strengths:        decode_strings(&self.strengths_json)?,
        improvements:     decode_strings(&self.improvements_json)?,
        grammar_issues:   decode_strings(&self.grammar_issues_json)?,
        score,
        criterion_scores: serde_json::from_str(&self.criterion_scores_json)?,
        band:             self.band.and_then(|b| u8::try_from(b).ok()),
        model:            self.model,
        raw_text:         self.raw_text,
      },
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}
