//! [`Grader`] backed by the OpenAI client.

use std::{future::Future, time::Duration};

use rubriq_core::{
  feedback::{CriterionScore, FeedbackDraft, Score},
  grade::{Grader, GradingRequest},
  rubric::Rubric,
};
use serde::Deserialize;

use crate::{
  client::{self, ChatOptions, OpenAiClient, extract_json},
  error::{Error, Result},
  prompt, score, sections,
};

/// Settings for [`OpenAiGrader`]; the `openai` section of the server config.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
  pub api_key:           String,
  #[serde(default = "default_model")]
  pub model:             String,
  #[serde(default = "default_base_url")]
  pub base_url:          String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:      u64,
  /// Ask for a JSON object instead of headed prose.
  #[serde(default)]
  pub structured_output: bool,
  #[serde(default = "default_temperature")]
  pub temperature:       f32,
  #[serde(default = "default_max_tokens")]
  pub max_tokens:        u32,
}

fn default_model() -> String { client::DEFAULT_MODEL.to_owned() }
fn default_base_url() -> String { client::DEFAULT_BASE_URL.to_owned() }
fn default_timeout_secs() -> u64 { 60 }
fn default_temperature() -> f32 { ChatOptions::default().temperature }
fn default_max_tokens() -> u32 { ChatOptions::default().max_tokens }

#[derive(Debug, Clone)]
pub struct OpenAiGrader {
  client:     OpenAiClient,
  options:    ChatOptions,
  structured: bool,
}

impl OpenAiGrader {
  pub fn new(config: &OpenAiConfig) -> Result<Self> {
    let client = OpenAiClient::new(
      config.api_key.clone(),
      config.model.clone(),
      config.base_url.clone(),
      Duration::from_secs(config.timeout_secs),
    )?;
    Ok(Self {
      client,
      options: ChatOptions {
        temperature:   config.temperature,
        max_tokens:    config.max_tokens,
        json_response: config.structured_output,
      },
      structured: config.structured_output,
    })
  }

  pub fn model(&self) -> &str { self.client.model() }
}

impl Grader for OpenAiGrader {
  type Error = Error;

  fn grade(
    &self,
    request: GradingRequest,
  ) -> impl Future<Output = Result<FeedbackDraft>> + Send + '_ {
    async move {
      let messages = prompt::messages(&request, self.structured);
      tracing::debug!(
        model = self.model(),
        words = request.word_count(),
        structured = self.structured,
        "requesting feedback"
      );
      let text = self.client.chat(&messages, self.options).await?;
      Ok(draft_from_response(
        &text,
        request.rubric.as_ref(),
        self.model(),
        self.structured,
      ))
    }
  }
}

// ─── Response parsing ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct StructuredFeedback {
  #[serde(default)]
  summary:          String,
  #[serde(default)]
  strengths:        Vec<String>,
  #[serde(default)]
  improvements:     Vec<String>,
  #[serde(default)]
  grammar_issues:   Vec<String>,
  #[serde(default)]
  criterion_scores: Vec<StructuredCriterion>,
  #[serde(default)]
  overall_score:    Option<f64>,
  #[serde(default)]
  band:             Option<u8>,
}

#[derive(Debug, Deserialize)]
struct StructuredCriterion {
  category: String,
  score:    f64,
}

/// Turn model output into a draft. Structured output that does not parse
/// is read as prose instead.
pub fn draft_from_response(
  text: &str,
  rubric: Option<&Rubric>,
  model: &str,
  structured: bool,
) -> FeedbackDraft {
  if structured {
    match serde_json::from_str::<StructuredFeedback>(extract_json(text)) {
      Ok(parsed) => return from_structured(parsed, text, rubric, model),
      Err(e) => tracing::warn!(error = %e, "structured feedback did not parse; reading as prose"),
    }
  }
  from_prose(text, rubric, model)
}

fn from_prose(text: &str, rubric: Option<&Rubric>, model: &str) -> FeedbackDraft {
  let split = sections::split_sections(text);
  let criterion_scores = rubric
    .map(|r| score::criterion_scores(text, r))
    .unwrap_or_default();
  let overall = score::overall_score(text, rubric, &criterion_scores);

  FeedbackDraft {
    summary: split.summary,
    strengths: split.strengths,
    improvements: split.improvements,
    grammar_issues: split.grammar_issues,
    score: overall,
    criterion_scores,
    band: score::band(text, rubric, overall),
    model: model.to_owned(),
    raw_text: text.to_owned(),
  }
  .with_placeholders()
}

fn from_structured(
  parsed: StructuredFeedback,
  text: &str,
  rubric: Option<&Rubric>,
  model: &str,
) -> FeedbackDraft {
  let mut criterion_scores: Vec<CriterionScore> = Vec::new();
  if let Some(rubric) = rubric {
    for entry in &parsed.criterion_scores {
      let Some(criterion) = rubric.criterion(&entry.category) else {
        continue;
      };
      if criterion_scores.iter().any(|s| s.category == criterion.category) {
        continue;
      }
      criterion_scores.push(CriterionScore {
        category:   criterion.category.clone(),
        awarded:    entry.score.clamp(0.0, f64::from(criterion.max_points)),
        max_points: criterion.max_points,
      });
    }
  }

  let overall = match rubric {
    Some(r) if !r.criteria.is_empty() && criterion_scores.len() == r.criteria.len() => {
      Score::clamped(
        criterion_scores.iter().map(|s| s.awarded).sum(),
        f64::from(r.total_points()),
      )
    }
    Some(r) => parsed
      .overall_score
      .and_then(|s| Score::clamped(s, f64::from(r.total_points()))),
    None => parsed.overall_score.and_then(|s| Score::clamped(s, 100.0)),
  };

  let band = if rubric.is_some_and(Rubric::is_banded) {
    parsed
      .band
      .filter(|b| (1..=6).contains(b))
      .or_else(|| overall.map(|s| score::band_for_percentage(s.percentage())))
  } else {
    None
  };

  FeedbackDraft {
    summary: parsed.summary.trim().to_owned(),
    strengths: parsed.strengths,
    improvements: parsed.improvements,
    grammar_issues: parsed.grammar_issues,
    score: overall,
    criterion_scores,
    band,
    model: model.to_owned(),
    raw_text: text.to_owned(),
  }
  .with_placeholders()
}

#[cfg(test)]
mod tests {
  use axum::{Json, Router, routing::post};
  use chrono::Utc;
  use rubriq_core::{
    feedback::{NO_GRAMMAR_ISSUES, NO_STRENGTHS},
    rubric::{Criterion, GradingScale},
  };
  use serde_json::{Value, json};
  use uuid::Uuid;

  use super::*;

  fn rubric(scale: GradingScale) -> Rubric {
    Rubric {
      rubric_id:     Uuid::new_v4(),
      teacher_id:    Uuid::new_v4(),
      name:          "Language Paper 2".into(),
      subject:       "English Language".into(),
      exam_board:    Some("AQA".into()),
      grading_scale: scale,
      criteria:      vec![Criterion::new("Content", 24), Criterion::new("Technical Accuracy", 16)],
      version:       1,
      parent_id:     None,
      created_at:    Utc::now(),
    }
  }

  #[test]
  fn prose_response_is_split_and_scored() {
    let text = "\
A confident, well-organised piece.

Strengths:
- Engaging opening
Areas for Improvement:
- Use a wider range of punctuation
Content: 20/24
Technical Accuracy: 12/16
";
    let r = rubric(GradingScale::GcseBand);
    let draft = draft_from_response(text, Some(&r), "gpt-test", false);

    assert_eq!(draft.summary, "A confident, well-organised piece.\nContent: 20/24\nTechnical Accuracy: 12/16");
    assert_eq!(draft.strengths, vec!["Engaging opening"]);
    assert_eq!(draft.grammar_issues, vec![NO_GRAMMAR_ISSUES]);
    assert_eq!(draft.criterion_scores.len(), 2);
    assert_eq!(draft.score, Some(Score { awarded: 32.0, out_of: 40.0 }));
    assert_eq!(draft.band, Some(5));
    assert_eq!(draft.model, "gpt-test");
    assert_eq!(draft.raw_text, text);
  }

  #[test]
  fn structured_response_is_matched_to_the_rubric() {
    let text = r#"```json
{
  "summary": " Strong argument. ",
  "strengths": ["Clear stance"],
  "improvements": [],
  "criterion_scores": [
    {"category": "content", "score": 30},
    {"category": "Creativity", "score": 5},
    {"category": "technical accuracy", "score": 10}
  ],
  "overall_score": 99,
  "band": 4
}
```"#;
    let r = rubric(GradingScale::GcseBand);
    let draft = draft_from_response(text, Some(&r), "gpt-test", true);

    assert_eq!(draft.summary, "Strong argument.");
    assert_eq!(draft.improvements.len(), 1);
    assert_eq!(draft.grammar_issues, vec![NO_GRAMMAR_ISSUES]);
    let names: Vec<_> = draft.criterion_scores.iter().map(|c| c.category.as_str()).collect();
    assert_eq!(names, ["Content", "Technical Accuracy"]);
    assert_eq!(draft.criterion_scores[0].awarded, 24.0);
    assert_eq!(draft.score, Some(Score { awarded: 34.0, out_of: 40.0 }));
    assert_eq!(draft.band, Some(4));
  }

  #[test]
  fn unparseable_structured_output_falls_back_to_prose() {
    let text = "Strengths:\n- Lively voice\nScore: 7/10";
    let draft = draft_from_response(text, None, "gpt-test", true);
    assert_eq!(draft.strengths, vec!["Lively voice"]);
    assert_eq!(draft.score, Some(Score { awarded: 7.0, out_of: 10.0 }));
    assert_eq!(draft.band, None);
  }

  #[test]
  fn structured_without_rubric_scores_out_of_100() {
    let draft = draft_from_response(r#"{"summary": "ok", "overall_score": 64}"#, None, "m", true);
    assert_eq!(draft.score, Some(Score { awarded: 64.0, out_of: 100.0 }));
    assert_eq!(draft.strengths, vec![NO_STRENGTHS]);
    assert!(draft.criterion_scores.is_empty());
  }

  #[tokio::test]
  async fn grades_through_the_chat_endpoint() {
    let router = Router::new().route(
      "/v1/chat/completions",
      post(|Json(body): Json<Value>| async move {
        let user = body["messages"][1]["content"].as_str().unwrap_or_default();
        assert!(user.contains("Technical Accuracy (max 16 points)"));
        Json(json!({
          "choices": [{ "message": { "content": "Strengths:\n- Vivid detail\nContent: 18/24" } }]
        }))
      }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

    let grader = OpenAiGrader::new(&OpenAiConfig {
      api_key:           "sk-test".into(),
      model:             "gpt-test".into(),
      base_url:          format!("http://{addr}/v1"),
      timeout_secs:      5,
      structured_output: false,
      temperature:       0.2,
      max_tokens:        500,
    })
    .unwrap();

    let draft = grader
      .grade(GradingRequest {
        title:   "A day at the beach".into(),
        content: "The waves crashed.".into(),
        rubric:  Some(rubric(GradingScale::Points)),
      })
      .await
      .unwrap();

    assert_eq!(draft.strengths, vec!["Vivid detail"]);
    assert_eq!(draft.criterion_scores[0].awarded, 18.0);
    assert_eq!(draft.band, None);
  }

  #[test]
  fn config_defaults() {
    let config: OpenAiConfig = serde_json::from_value(json!({ "api_key": "sk" })).unwrap();
    assert_eq!(config.model, client::DEFAULT_MODEL);
    assert_eq!(config.base_url, client::DEFAULT_BASE_URL);
    assert!(!config.structured_output);
  }
}
