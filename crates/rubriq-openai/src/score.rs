//! Score and band extraction from model prose.

use std::sync::LazyLock;

use regex::Regex;
use rubriq_core::{
  feedback::{CriterionScore, Score},
  rubric::Rubric,
};

/// Optional bullet, heading marker or emphasis in front of a label.
const LEAD: &str = r"^[\s#>*•–-]*(?:\d+[.)]\s*)?(?:\*\*|__)?\s*";
/// `<n>/<max>` or `<n> out of <max>`, allowing emphasis around the label.
const FRACTION: &str =
  r"(?:\*\*|__)?\s*[:\-–]?\s*(?:\*\*|__)?\s*(\d+(?:\.\d+)?)\s*(?:/|out\s+of)\s*(\d+(?:\.\d+)?)";

static OVERALL: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(&format!(
    r"(?im){LEAD}(?:overall\s+score|total\s+score|overall\s+mark|score|total|marks?){FRACTION}"
  ))
  .expect("valid regex")
});

static PERCENT: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(&format!(
    r"(?im){LEAD}(?:overall\s+score|total\s+score|score)(?:\*\*|__)?\s*:\s*(?:\*\*|__)?\s*(\d+(?:\.\d+)?)\s*%"
  ))
  .expect("valid regex")
});

static BAND: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)\bband\b\s*:?\s*(?:\*\*|__)?\s*([1-6])\b").expect("valid regex"));

/// Scores for the rubric's criteria, in rubric order. A criterion is scored
/// by the first line naming it with a fraction; the awarded value is clamped
/// to the rubric's maximum. Unscored criteria are omitted.
pub fn criterion_scores(text: &str, rubric: &Rubric) -> Vec<CriterionScore> {
  rubric
    .criteria
    .iter()
    .filter_map(|c| {
      let pattern = format!(r"(?im){LEAD}{}{FRACTION}", regex::escape(&c.category));
      let re = Regex::new(&pattern).ok()?;
      let awarded: f64 = re.captures(text)?.get(1)?.as_str().parse().ok()?;
      Some(CriterionScore {
        category:   c.category.clone(),
        awarded:    awarded.clamp(0.0, f64::from(c.max_points)),
        max_points: c.max_points,
      })
    })
    .collect()
}

/// The overall score: the criterion sum when every criterion is scored,
/// otherwise the first overall-score line, otherwise a percentage line.
pub fn overall_score(
  text: &str,
  rubric: Option<&Rubric>,
  criteria: &[CriterionScore],
) -> Option<Score> {
  if let Some(rubric) = rubric {
    if !rubric.criteria.is_empty() && criteria.len() == rubric.criteria.len() {
      let sum = criteria.iter().map(|c| c.awarded).sum();
      return Score::clamped(sum, f64::from(rubric.total_points()));
    }
  }

  if let Some(caps) = OVERALL.captures(text) {
    let awarded = caps.get(1)?.as_str().parse().ok()?;
    let out_of = caps.get(2)?.as_str().parse().ok()?;
    return Score::clamped(awarded, out_of);
  }

  let caps = PERCENT.captures(text)?;
  Score::clamped(caps.get(1)?.as_str().parse().ok()?, 100.0)
}

/// A `Band <1-6>` mention in the text.
pub fn explicit_band(text: &str) -> Option<u8> {
  BAND.captures(text)?.get(1)?.as_str().parse().ok()
}

/// GCSE band from a percentage: 85 → 6, 70 → 5, 55 → 4, 40 → 3, 25 → 2.
pub fn band_for_percentage(percent: f64) -> u8 {
  match percent {
    p if p >= 85.0 => 6,
    p if p >= 70.0 => 5,
    p if p >= 55.0 => 4,
    p if p >= 40.0 => 3,
    p if p >= 25.0 => 2,
    _ => 1,
  }
}

/// Band for a banded rubric: explicit mention first, then the score.
pub fn band(text: &str, rubric: Option<&Rubric>, score: Option<Score>) -> Option<u8> {
  if !rubric.is_some_and(Rubric::is_banded) {
    return None;
  }
  explicit_band(text).or_else(|| score.map(|s| band_for_percentage(s.percentage())))
}
