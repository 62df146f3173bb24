//! Rubric file import.
//!
//! Teachers bring rubrics from spreadsheets and other tools. This crate turns
//! such a file into validated [`Criterion`] rows:
//!
//! - **CSV**: column meaning is guessed from header names (see [`columns`]);
//!   a file without a recognisable header is read as `category, points`.
//! - **JSON**: either the criteria array itself
//!   (`[{"category": "...", "maxPoints": 10}]`) or an object carrying a
//!   `criteria` array plus optional `name` and `subject`.
//!
//! Malformed rows never fail the import; they are reported in
//! [`RubricImport::skipped`] with a row number and reason. An import that
//! yields no criteria at all is an error.

pub mod columns;
mod csv_import;
pub mod error;
mod json_import;

use std::collections::HashSet;

use rubriq_core::rubric::Criterion;
use serde::{Deserialize, Serialize};

pub use error::{Error, Result};

// ─── Public types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RubricFormat {
  Csv,
  Json,
}

impl RubricFormat {
  /// JSON if the input opens with `[` or `{`, CSV otherwise.
  pub fn detect(input: &str) -> Self {
    match strip_bom(input).trim_start().chars().next() {
      Some('[' | '{') => Self::Json,
      _ => Self::Csv,
    }
  }
}

/// A row that was dropped during import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRow {
  /// Line number for CSV, 1-based element index for JSON.
  pub row:    u64,
  pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricImport {
  /// Rubric name, when the file carries one (JSON object form only).
  pub name:     Option<String>,
  pub subject:  Option<String>,
  pub criteria: Vec<Criterion>,
  pub skipped:  Vec<SkippedRow>,
}

/// Import a rubric file. `format` defaults to [`RubricFormat::detect`].
pub fn import_rubric(input: &str, format: Option<RubricFormat>) -> Result<RubricImport> {
  let input = strip_bom(input);
  if input.trim().is_empty() {
    return Err(Error::Empty);
  }

  let import = match format.unwrap_or_else(|| RubricFormat::detect(input)) {
    RubricFormat::Csv => csv_import::import(input)?,
    RubricFormat::Json => json_import::import(input)?,
  };

  if import.criteria.is_empty() {
    return Err(Error::NoCriteria { skipped: import.skipped.len() });
  }
  Ok(import)
}

fn strip_bom(input: &str) -> &str { input.strip_prefix('\u{feff}').unwrap_or(input) }

// ─── Row collection ──────────────────────────────────────────────────────────

/// Accumulates accepted criteria and skipped rows; shared by both formats.
#[derive(Default)]
struct Collector {
  seen:     HashSet<String>,
  criteria: Vec<Criterion>,
  skipped:  Vec<SkippedRow>,
}

impl Collector {
  fn skip(&mut self, row: u64, reason: impl Into<String>) {
    self.skipped.push(SkippedRow { row, reason: reason.into() });
  }

  fn accept(
    &mut self,
    row: u64,
    category: Option<&str>,
    points: Option<&str>,
    description: Option<&str>,
  ) {
    let category = category.map(str::trim).unwrap_or_default();
    if category.is_empty() {
      return self.skip(row, "missing category");
    }

    let max_points = match points.map(parse_points) {
      None => return self.skip(row, format!("{category:?}: missing points")),
      Some(Err(why)) => return self.skip(row, format!("{category:?}: {why}")),
      Some(Ok(p)) => p,
    };

    if !self.seen.insert(category.to_lowercase()) {
      return self.skip(row, format!("{category:?}: duplicate category"));
    }

    self.criteria.push(Criterion {
      category:    category.to_owned(),
      max_points,
      description: description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_owned),
    });
  }

  fn finish(self, name: Option<String>, subject: Option<String>) -> RubricImport {
    RubricImport {
      name,
      subject,
      criteria: self.criteria,
      skipped: self.skipped,
    }
  }
}

/// Parse a points cell: a positive whole number, optionally written as a
/// decimal (`10.0`) or followed by `pts`, `points` or `marks`.
pub fn parse_points(raw: &str) -> Result<u32, &'static str> {
  let lowered = raw.trim().to_ascii_lowercase();
  let mut text = lowered.as_str();
  for suffix in ["points", "point", "pts", "pt", "marks", "mark"] {
    if let Some(rest) = text.strip_suffix(suffix) {
      text = rest.trim_end();
      break;
    }
  }

  if text.is_empty() {
    return Err("missing points");
  }
  let value: f64 = text.parse().map_err(|_| "points are not a number")?;
  if !value.is_finite() {
    return Err("points are not a number");
  }
  if value <= 0.0 {
    return Err("points must be positive");
  }
  if value.fract() != 0.0 {
    return Err("points must be a whole number");
  }
  if value > f64::from(u32::MAX) {
    return Err("points are too large");
  }
  Ok(value as u32)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn detects_format_from_first_character() {
    assert_eq!(RubricFormat::detect("  [{\"category\": \"x\"}]"), RubricFormat::Json);
    assert_eq!(RubricFormat::detect("\u{feff}{\"criteria\": []}"), RubricFormat::Json);
    assert_eq!(RubricFormat::detect("Category,Points"), RubricFormat::Csv);
  }

  #[test]
  fn parses_point_cells() {
    assert_eq!(parse_points("10"), Ok(10));
    assert_eq!(parse_points(" 12.0 "), Ok(12));
    assert_eq!(parse_points("5 pts"), Ok(5));
    assert_eq!(parse_points("20 Marks"), Ok(20));
    assert!(parse_points("0").is_err());
    assert!(parse_points("-4").is_err());
    assert!(parse_points("2.5").is_err());
    assert!(parse_points("ten").is_err());
    assert!(parse_points("").is_err());
  }

  #[test]
  fn empty_input_is_an_error() {
    assert!(matches!(import_rubric("  \n", None), Err(Error::Empty)));
  }

  #[test]
  fn import_with_only_bad_rows_fails() {
    let result = import_rubric("Category,Points\nThesis,zero\n,5\n", None);
    assert!(matches!(result, Err(Error::NoCriteria { skipped: 2 })));
  }
}
