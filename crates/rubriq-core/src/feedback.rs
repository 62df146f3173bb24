//! Feedback: the AI-generated assessment attached to one essay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Placeholder used when no strengths could be extracted.
pub const NO_STRENGTHS: &str = "No specific strengths identified";
/// Placeholder used when no improvements could be extracted.
pub const NO_IMPROVEMENTS: &str = "No specific areas for improvement identified";
/// Placeholder used when no grammar issues could be extracted.
pub const NO_GRAMMAR_ISSUES: &str = "No significant grammar issues found";

// ─── Scores ──────────────────────────────────────────────────────────────────

/// Points awarded out of a maximum. `awarded` never exceeds `out_of`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
  pub awarded: f64,
  pub out_of:  f64,
}

impl Score {
  /// Build a score, clamping `awarded` into `[0, out_of]`. Returns `None` for
  /// a non-positive or non-finite maximum.
  pub fn clamped(awarded: f64, out_of: f64) -> Option<Self> {
    if !out_of.is_finite() || out_of <= 0.0 || !awarded.is_finite() {
      return None;
    }
    Some(Self { awarded: awarded.clamp(0.0, out_of), out_of })
  }

  pub fn percentage(&self) -> f64 { self.awarded / self.out_of * 100.0 }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
  pub category:   String,
  pub awarded:    f64,
  pub max_points: u32,
}

// ─── Draft ───────────────────────────────────────────────────────────────────

/// What a [`crate::grade::Grader`] produces for one essay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackDraft {
  pub summary:          String,
  pub strengths:        Vec<String>,
  pub improvements:     Vec<String>,
  pub grammar_issues:   Vec<String>,
  pub score:            Option<Score>,
  pub criterion_scores: Vec<CriterionScore>,
  /// GCSE band, 1 to 6. Only present for banded rubrics.
  pub band:             Option<u8>,
  /// The model that produced the feedback.
  pub model:            String,
  /// The unprocessed model output.
  pub raw_text:         String,
}

impl FeedbackDraft {
  /// Replace empty buckets with their placeholder text.
  pub fn with_placeholders(mut self) -> Self {
    fill_placeholder(&mut self.strengths, NO_STRENGTHS);
    fill_placeholder(&mut self.improvements, NO_IMPROVEMENTS);
    fill_placeholder(&mut self.grammar_issues, NO_GRAMMAR_ISSUES);
    self
  }
}

fn fill_placeholder(items: &mut Vec<String>, placeholder: &str) {
  items.retain(|s| !s.trim().is_empty());
  if items.is_empty() {
    items.push(placeholder.to_owned());
  }
}

// ─── Feedback ────────────────────────────────────────────────────────────────

/// A persisted draft. There is at most one per essay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
  pub feedback_id: Uuid,
  pub essay_id:    Uuid,
  #[serde(flatten)]
  pub draft:       FeedbackDraft,
  pub created_at:  DateTime<Utc>,
}
