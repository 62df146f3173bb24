//! The `Grader` trait, implemented by LLM backends.

use std::future::Future;

use crate::{essay::word_count, feedback::FeedbackDraft, rubric::Rubric};

/// Everything a grader needs to assess one piece of writing.
#[derive(Debug, Clone)]
pub struct GradingRequest {
  pub title:   String,
  pub content: String,
  pub rubric:  Option<Rubric>,
}

impl GradingRequest {
  pub fn word_count(&self) -> u32 { word_count(&self.content) }
}

/// Produces feedback for a [`GradingRequest`].
///
/// Implemented by `rubriq-openai`; tests use in-process stubs.
pub trait Grader: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn grade(
    &self,
    request: GradingRequest,
  ) -> impl Future<Output = Result<FeedbackDraft, Self::Error>> + Send + '_;
}
