//! Rubrics: named sets of grading criteria with per-criterion maxima.
//!
//! Rubrics are versioned by cloning: a clone is a new rubric whose
//! `parent_id` points at its source and whose `version` is one higher.

use std::{collections::HashSet, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Criterion ───────────────────────────────────────────────────────────────

/// One row of a rubric. Serialised camelCase to match the stored criteria
/// array (`[{"category": "...", "maxPoints": 10}]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
  pub category:    String,
  pub max_points:  u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

impl Criterion {
  pub fn new(category: impl Into<String>, max_points: u32) -> Self {
    Self { category: category.into(), max_points, description: None }
  }
}

// ─── Grading scale ───────────────────────────────────────────────────────────

/// Whether feedback for this rubric is banded.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum GradingScale {
  /// Plain points out of the rubric total.
  #[default]
  Points,
  /// Points plus a GCSE band from 1 to 6.
  GcseBand,
}

impl GradingScale {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Points => "points",
      Self::GcseBand => "gcse_band",
    }
  }
}

impl FromStr for GradingScale {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "points" => Ok(Self::Points),
      "gcse_band" | "gcse" | "band" => Ok(Self::GcseBand),
      other => Err(Error::UnknownVariant {
        kind:  "grading scale",
        value: other.to_owned(),
      }),
    }
  }
}

// ─── Rubric ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rubric {
  pub rubric_id:     Uuid,
  pub teacher_id:    Uuid,
  pub name:          String,
  pub subject:       String,
  pub exam_board:    Option<String>,
  pub grading_scale: GradingScale,
  pub criteria:      Vec<Criterion>,
  /// Starts at 1; each clone is one higher than its source.
  pub version:       u32,
  /// The rubric this one was cloned from.
  pub parent_id:     Option<Uuid>,
  pub created_at:    DateTime<Utc>,
}

impl Rubric {
  pub fn total_points(&self) -> u32 { total_points(&self.criteria) }

  /// Case-insensitive lookup of a criterion by category name.
  pub fn criterion(&self, category: &str) -> Option<&Criterion> {
    let wanted = category.trim();
    self
      .criteria
      .iter()
      .find(|c| c.category.eq_ignore_ascii_case(wanted))
  }

  pub fn is_banded(&self) -> bool {
    self.grading_scale == GradingScale::GcseBand
  }
}

/// Saturates rather than overflowing; validated criteria always fit.
pub fn total_points(criteria: &[Criterion]) -> u32 {
  criteria.iter().fold(0u32, |total, c| total.saturating_add(c.max_points))
}

/// Input to [`crate::store::GradingStore::add_rubric`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewRubric {
  pub name:          String,
  #[serde(default)]
  pub subject:       String,
  pub exam_board:    Option<String>,
  #[serde(default)]
  pub grading_scale: GradingScale,
  pub criteria:      Vec<Criterion>,
}

impl NewRubric {
  /// Trim every text field and check the rubric invariants.
  pub fn normalized(self) -> Result<Self> {
    let name = self.name.trim().to_owned();
    if name.is_empty() {
      return Err(Error::InvalidRubric("name must not be empty".into()));
    }
    let criteria = validate_criteria(self.criteria)?;
    Ok(Self {
      name,
      subject: self.subject.trim().to_owned(),
      exam_board: self
        .exam_board
        .map(|b| b.trim().to_owned())
        .filter(|b| !b.is_empty()),
      grading_scale: self.grading_scale,
      criteria,
    })
  }
}

/// Trim categories and enforce: at least one criterion, no blank category,
/// positive maxima, a total that fits in a `u32`, and no duplicate category
/// (ignoring case).
pub fn validate_criteria(criteria: Vec<Criterion>) -> Result<Vec<Criterion>> {
  if criteria.is_empty() {
    return Err(Error::InvalidRubric("at least one criterion is required".into()));
  }

  let mut seen = HashSet::new();
  let mut total = 0u32;
  let mut out = Vec::with_capacity(criteria.len());
  for c in criteria {
    let category = c.category.trim().to_owned();
    if category.is_empty() {
      return Err(Error::InvalidRubric("criterion category must not be empty".into()));
    }
    if c.max_points == 0 {
      return Err(Error::InvalidRubric(format!(
        "criterion {category:?} must be worth at least one point"
      )));
    }
    total = total
      .checked_add(c.max_points)
      .ok_or_else(|| Error::InvalidRubric("total points are too large".into()))?;
    if !seen.insert(category.to_lowercase()) {
      return Err(Error::InvalidRubric(format!(
        "duplicate criterion {category:?}"
      )));
    }
    out.push(Criterion {
      category,
      max_points: c.max_points,
      description: c
        .description
        .map(|d| d.trim().to_owned())
        .filter(|d| !d.is_empty()),
    });
  }
  Ok(out)
}

/// Options for [`crate::store::GradingStore::clone_rubric`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RubricClone {
  /// Defaults to the source rubric's name.
  pub name: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn rubric(criteria: Vec<Criterion>) -> NewRubric {
    NewRubric {
      name: "  Persuasive writing ".into(),
      subject: "English".into(),
      exam_board: Some("  ".into()),
      grading_scale: GradingScale::Points,
      criteria,
    }
  }

  #[test]
  fn normalizes_text_fields() {
    let r = rubric(vec![Criterion::new(" Structure ", 10)]).normalized().unwrap();
    assert_eq!(r.name, "Persuasive writing");
    assert_eq!(r.exam_board, None);
    assert_eq!(r.criteria[0].category, "Structure");
  }

  #[test]
  fn rejects_empty_criteria() {
    assert!(matches!(
      rubric(vec![]).normalized(),
      Err(Error::InvalidRubric(_))
    ));
  }

  #[test]
  fn rejects_zero_points() {
    assert!(rubric(vec![Criterion::new("Structure", 0)]).normalized().is_err());
  }

  #[test]
  fn rejects_a_total_that_does_not_fit() {
    let r = rubric(vec![Criterion::new("Structure", u32::MAX), Criterion::new("Style", 2)]);
    assert!(matches!(
      r.normalized(),
      Err(Error::InvalidRubric(m)) if m.contains("too large")
    ));
    let ok = rubric(vec![Criterion::new("Structure", u32::MAX - 2), Criterion::new("Style", 2)]);
    assert!(ok.normalized().is_ok());
  }

  #[test]
  fn total_points_saturates() {
    let criteria = [Criterion::new("Structure", u32::MAX), Criterion::new("Style", 2)];
    assert_eq!(total_points(&criteria), u32::MAX);
    assert_eq!(total_points(&[Criterion::new("A", 3), Criterion::new("B", 4)]), 7);
  }

  #[test]
  fn rejects_duplicate_categories_ignoring_case() {
    let r = rubric(vec![Criterion::new("Structure", 5), Criterion::new("structure", 5)]);
    assert!(r.normalized().is_err());
  }

  #[test]
  fn criteria_use_camel_case_on_the_wire() {
    let json = serde_json::to_value(Criterion::new("Evidence", 8)).unwrap();
    assert_eq!(json, serde_json::json!({ "category": "Evidence", "maxPoints": 8 }));
  }

  #[test]
  fn criterion_lookup_ignores_case() {
    let r = Rubric {
      rubric_id:     Uuid::new_v4(),
      teacher_id:    Uuid::new_v4(),
      name:          "R".into(),
      subject:       String::new(),
      exam_board:    None,
      grading_scale: GradingScale::GcseBand,
      criteria:      vec![Criterion::new("Evidence", 8), Criterion::new("Style", 4)],
      version:       1,
      parent_id:     None,
      created_at:    Utc::now(),
    };
    assert_eq!(r.criterion("evidence").map(|c| c.max_points), Some(8));
    assert_eq!(r.total_points(), 12);
    assert!(r.is_banded());
  }
}
