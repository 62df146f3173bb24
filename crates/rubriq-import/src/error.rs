//! Error type for `rubriq-import`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("the file is empty")]
  Empty,

  #[error("could not find a {0} column in the header row")]
  MissingColumn(&'static str),

  #[error("the header row does not name a category or points column")]
  UnrecognisedHeader,

  #[error("expected a JSON array of criteria or an object with a `criteria` array")]
  UnexpectedJsonShape,

  #[error("no valid criteria found ({skipped} rows skipped)")]
  NoCriteria { skipped: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
