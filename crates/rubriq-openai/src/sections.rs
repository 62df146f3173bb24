//! Splitting model prose into feedback buckets.
//!
//! The model is asked for headed sections but replies vary: markdown headings,
//! bold labels, numbered headings, inline text after the colon, or no
//! headings at all. The splitter walks the text line by line:
//!
//! - a recognised heading opens its section; text after the colon is the
//!   section's first item;
//! - any other heading-shaped line (`Score: 18/25`, `## Overall`,
//!   `**Summary**`) closes the open section;
//! - bullet lines inside a section become items;
//! - a prose line becomes the first item of an empty section, and otherwise
//!   closes the section;
//! - everything outside a section is the summary.
//!
//! Empty buckets are filled with the placeholders from
//! [`rubriq_core::feedback`].

use std::sync::LazyLock;

use regex::Regex;
use rubriq_core::feedback::{NO_GRAMMAR_ISSUES, NO_IMPROVEMENTS, NO_STRENGTHS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
  Strengths,
  Improvements,
  Grammar,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
  pub summary:        String,
  pub strengths:      Vec<String>,
  pub improvements:   Vec<String>,
  pub grammar_issues: Vec<String>,
}

impl Sections {
  fn bucket(&mut self, section: Section) -> &mut Vec<String> {
    match section {
      Section::Strengths => &mut self.strengths,
      Section::Improvements => &mut self.improvements,
      Section::Grammar => &mut self.grammar_issues,
    }
  }
}

static STRENGTHS: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)^(?:key\s+)?(?:strengths?|what\s+went\s+well|what\s+works\s+well|positives)\b")
    .expect("valid regex")
});

static IMPROVEMENTS: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r"(?i)^(?:areas?\s+(?:for|of)\s+improvement|areas?\s+to\s+improve|improvements?|weaknesses|next\s+steps|targets)\b",
  )
  .expect("valid regex")
});

static GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r"(?i)^(?:grammar\s+and\s+(?:spelling|punctuation)|spelling\s+and\s+grammar|grammar(?:\s+issues)?|spag|language\s+issues)\b",
  )
  .expect("valid regex")
});

/// `1.` / `2)` list numbering in front of a heading.
static NUMBERING: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^\d+[.)]\s+").expect("valid regex"));

static BULLET: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^(?:[-*•–]|\d+[.)])\s+(.*)$").expect("valid regex"));

/// A short label of up to four words followed by a colon.
static LABEL: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^[A-Za-z][A-Za-z'&/-]*(?:\s+[A-Za-z'&/-]+){0,3}\s*:(.*)$").expect("valid regex")
});

enum Line<'a> {
  Blank,
  /// A recognised heading and any inline text after its colon.
  Heading(Section, Option<String>),
  /// Some other heading; `true` when it carries content worth keeping.
  OtherHeading(bool),
  Bullet(&'a str),
  Prose,
}

/// Split `text` into summary and buckets, filling empty buckets with
/// placeholders.
pub fn split_sections(text: &str) -> Sections {
  let mut out = Sections::default();
  let mut summary: Vec<String> = Vec::new();
  let mut current: Option<Section> = None;

  for raw in text.lines() {
    let line = raw.trim();
    match classify(line) {
      Line::Blank => {}
      Line::Heading(section, inline) => {
        current = Some(section);
        if let Some(item) = inline {
          out.bucket(section).push(item);
        }
      }
      Line::OtherHeading(keep) => {
        current = None;
        if keep {
          summary.push(strip_emphasis(line));
        }
      }
      Line::Bullet(item) => match current {
        Some(section) => {
          let item = strip_emphasis(item);
          if !item.is_empty() {
            out.bucket(section).push(item);
          }
        }
        None => summary.push(line.to_owned()),
      },
      Line::Prose => match current {
        Some(section) if out.bucket(section).is_empty() => {
          out.bucket(section).push(strip_emphasis(line));
        }
        _ => {
          current = None;
          summary.push(line.to_owned());
        }
      },
    }
  }

  out.summary = summary.join("\n").trim().to_owned();
  fill(&mut out.strengths, NO_STRENGTHS);
  fill(&mut out.improvements, NO_IMPROVEMENTS);
  fill(&mut out.grammar_issues, NO_GRAMMAR_ISSUES);
  out
}

fn fill(items: &mut Vec<String>, placeholder: &str) {
  if items.is_empty() {
    items.push(placeholder.to_owned());
  }
}

fn classify(line: &str) -> Line<'_> {
  if line.is_empty() {
    return Line::Blank;
  }

  let markdown = line.starts_with('#');
  let text = line.trim_start_matches('#').trim_start();
  let numbered = NUMBERING.find(text);
  let text = numbered.map_or(text, |m| &text[m.end()..]);
  let text = trim_leading_emphasis(text);

  // A numbered line with text after the heading word is a list item.
  match known_heading(text, markdown) {
    Some(Line::Heading(_, Some(_))) if numbered.is_some() && !markdown => {}
    Some(heading) => return heading,
    None => {}
  }

  if markdown {
    return Line::OtherHeading(false);
  }
  if is_bold_line(line) {
    return Line::OtherHeading(false);
  }
  if !BULLET.is_match(line) {
    if let Some(caps) = LABEL.captures(text) {
      let rest = caps.get(1).map_or("", |m| m.as_str());
      return Line::OtherHeading(!strip_emphasis(rest).is_empty());
    }
  }

  match BULLET.captures(line).and_then(|c| c.get(1)) {
    Some(item) => Line::Bullet(item.as_str()),
    None => Line::Prose,
  }
}

fn known_heading(text: &str, markdown: bool) -> Option<Line<'static>> {
  let (section, len) = [
    (Section::Strengths, &*STRENGTHS),
    (Section::Improvements, &*IMPROVEMENTS),
    (Section::Grammar, &*GRAMMAR),
  ]
  .into_iter()
  .find_map(|(section, re)| re.find(text).map(|m| (section, m.end())))?;

  let rest = trim_leading_emphasis(&text[len..]);
  if let Some(inline) = rest.strip_prefix(':') {
    let inline = strip_emphasis(inline);
    return Some(Line::Heading(section, (!inline.is_empty()).then_some(inline)));
  }
  if rest.is_empty() || markdown {
    return Some(Line::Heading(section, None));
  }
  None
}

/// `**Summary**` or `__Overall:__` on a line of its own.
fn is_bold_line(line: &str) -> bool {
  let inner = line.trim_end_matches(':');
  (inner.starts_with("**") && inner.ends_with("**") && inner.len() > 4)
    || (inner.starts_with("__") && inner.ends_with("__") && inner.len() > 4)
}

/// Drop a leading `**` or `__`. A single `*` is a bullet, not emphasis.
fn trim_leading_emphasis(text: &str) -> &str {
  text
    .strip_prefix("**")
    .or_else(|| text.strip_prefix("__"))
    .unwrap_or(text)
    .trim_start()
}

fn strip_emphasis(text: &str) -> String {
  text.replace("**", "").replace("__", "").trim().to_owned()
}
