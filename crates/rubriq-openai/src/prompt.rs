//! Prompt construction.

use std::fmt::Write;

use rubriq_core::{grade::GradingRequest, rubric::Rubric};

use crate::client::Message;

const MARKER_ROLE: &str = "You are an experienced secondary-school English teacher and exam \
                           marker. You assess student essays fairly, specifically and \
                           constructively, quoting the essay where it helps.";

const PROSE_FORMAT: &str = "Structure your reply with these headings, each on its own line:
Summary: two or three sentences on the essay overall.
Strengths: a bulleted list.
Areas for Improvement: a bulleted list of concrete next steps.
Grammar Issues: a bulleted list of specific errors with corrections.
When a rubric is given, add one line per criterion in the form `<criterion>: <score>/<max>` \
and finish with `Overall Score: <total>/<max>`.";

const JSON_FORMAT: &str = "Reply with a single JSON object and nothing else, using these keys:
{\"summary\": string, \"strengths\": [string], \"improvements\": [string], \
\"grammar_issues\": [string], \"criterion_scores\": [{\"category\": string, \"score\": number}], \
\"overall_score\": number, \"band\": number or null}
Use the rubric's criterion names exactly as given for `category`.";

/// The system message: marker role plus the reply format.
pub fn system_prompt(structured: bool) -> String {
  let format = if structured { JSON_FORMAT } else { PROSE_FORMAT };
  format!("{MARKER_ROLE}\n\n{format}")
}

/// The user message: the essay and, when present, its rubric.
pub fn user_prompt(request: &GradingRequest) -> String {
  let mut out = String::new();
  let title = request.title.trim();
  if !title.is_empty() {
    let _ = writeln!(out, "Essay title: {title}");
  }
  let _ = writeln!(out, "Word count: {}", request.word_count());
  out.push('\n');

  if let Some(rubric) = &request.rubric {
    write_rubric(&mut out, rubric);
    out.push('\n');
  }

  out.push_str("Essay:\n");
  out.push_str(request.content.trim());
  out.push('\n');
  out
}

fn write_rubric(out: &mut String, rubric: &Rubric) {
  let _ = writeln!(out, "Rubric: {}", rubric.name);
  if !rubric.subject.is_empty() {
    let _ = writeln!(out, "Subject: {}", rubric.subject);
  }
  if let Some(board) = &rubric.exam_board {
    let _ = writeln!(out, "Exam board: {board}");
  }
  out.push_str("Criteria:\n");
  for c in &rubric.criteria {
    let _ = write!(out, "- {} (max {} points)", c.category, c.max_points);
    if let Some(d) = &c.description {
      let _ = write!(out, ": {d}");
    }
    out.push('\n');
  }
  let _ = writeln!(out, "Total available: {} points", rubric.total_points());
  if rubric.is_banded() {
    out.push_str(
      "This is a GCSE rubric: also state the overall band on its own line as `Band: <1-6>`.\n",
    );
  }
}

/// Both messages for one grading.
pub fn messages(request: &GradingRequest, structured: bool) -> Vec<Message> {
  vec![
    Message::system(system_prompt(structured)),
    Message::user(user_prompt(request)),
  ]
}
