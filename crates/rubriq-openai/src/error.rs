//! Error type for `rubriq-openai`.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum Error {
  #[error("network error: {0}")]
  Transport(String),

  #[error("request to the model timed out")]
  Timeout,

  #[error("http {status}: {body}")]
  Http { status: u16, body: String },

  #[error("rate limited by the model provider")]
  RateLimited,

  #[error("invalid api key")]
  InvalidApiKey,

  #[error("malformed response: {0}")]
  MalformedResponse(String),

  #[error("the model returned an empty response")]
  EmptyResponse,

  #[error("missing api key: set openai.api_key or RUBRIQ_OPENAI__API_KEY")]
  MissingApiKey,
}

impl Error {
  /// Whether the failure is on the provider's side and worth trying again
  /// later. Nothing in this crate retries on its own.
  pub fn is_transient(&self) -> bool {
    match self {
      Self::Transport(_) | Self::Timeout | Self::RateLimited => true,
      Self::Http { status, .. } => (500..=599).contains(status),
      _ => false,
    }
  }
}

impl From<reqwest::Error> for Error {
  fn from(e: reqwest::Error) -> Self {
    if e.is_timeout() {
      Self::Timeout
    } else {
      Self::Transport(e.to_string())
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
