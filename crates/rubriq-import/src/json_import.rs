//! JSON rubric files: a bare criteria array, or an object wrapping one.

use serde_json::{Map, Value};

use crate::{
  Collector, Error, Result, RubricImport,
  columns::{Role, role_of_key},
};

pub(crate) fn import(input: &str) -> Result<RubricImport> {
  let value: Value = serde_json::from_str(input)?;

  let (items, name, subject) = match value {
    Value::Array(items) => (items, None, None),
    Value::Object(mut object) => {
      let Some(Value::Array(items)) = object.remove("criteria") else {
        return Err(Error::UnexpectedJsonShape);
      };
      (
        items,
        string_field(&object, "name"),
        string_field(&object, "subject"),
      )
    }
    _ => return Err(Error::UnexpectedJsonShape),
  };

  let mut collector = Collector::default();
  for (index, item) in items.iter().enumerate() {
    let row = index as u64 + 1;
    let Value::Object(fields) = item else {
      collector.skip(row, "not an object");
      continue;
    };

    let mut category = None;
    let mut points = None;
    let mut description = None;
    for (key, value) in fields {
      let slot = match role_of_key(key) {
        Some(Role::Category) => &mut category,
        Some(Role::Points) => &mut points,
        Some(Role::Description) => &mut description,
        None => continue,
      };
      if slot.is_none() {
        *slot = cell_text(value);
      }
    }

    collector.accept(
      row,
      category.as_deref(),
      points.as_deref(),
      description.as_deref(),
    );
  }

  Ok(collector.finish(name, subject))
}

/// JSON values as cell text. Numbers keep their literal form so `10.5` is
/// rejected by the points parser rather than silently truncated.
fn cell_text(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
  object
    .get(key)
    .and_then(Value::as_str)
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_owned)
}

#[cfg(test)]
mod tests {
  use crate::{Error, RubricFormat, import_rubric};

  #[test]
  fn imports_a_bare_criteria_array() {
    let import = import_rubric(
      r#"[
        {"category": "Argument", "maxPoints": 10, "description": "Clear thesis"},
        {"category": "Evidence", "maxPoints": "8"}
      ]"#,
      None,
    )
    .unwrap();

    assert_eq!(import.name, None);
    assert_eq!(import.criteria.len(), 2);
    assert_eq!(import.criteria[0].description.as_deref(), Some("Clear thesis"));
    assert_eq!(import.criteria[1].max_points, 8);
  }

  #[test]
  fn imports_a_wrapped_object_with_metadata() {
    let import = import_rubric(
      r#"{
        "name": "Macbeth essay",
        "subject": "English Literature",
        "criteria": [
          {"criterion": "AO1", "marks": 12},
          {"Name": "AO2", "Out of": 12, "guidance": "Language analysis"}
        ]
      }"#,
      Some(RubricFormat::Json),
    )
    .unwrap();

    assert_eq!(import.name.as_deref(), Some("Macbeth essay"));
    assert_eq!(import.subject.as_deref(), Some("English Literature"));
    assert_eq!(import.criteria[1].category, "AO2");
    assert_eq!(import.criteria[1].description.as_deref(), Some("Language analysis"));
  }

  #[test]
  fn skips_bad_elements_by_index() {
    let import = import_rubric(
      r#"[
        {"category": "Argument", "maxPoints": 10},
        "Evidence",
        {"category": "Style", "maxPoints": 2.5},
        {"category": "argument", "maxPoints": 4},
        {"maxPoints": 3}
      ]"#,
      None,
    )
    .unwrap();

    assert_eq!(import.criteria.len(), 1);
    let rows: Vec<_> = import.skipped.iter().map(|s| s.row).collect();
    assert_eq!(rows, [2, 3, 4, 5]);
    assert_eq!(import.skipped[0].reason, "not an object");
    assert_eq!(import.skipped[3].reason, "missing category");
  }

  #[test]
  fn rejects_unexpected_shapes() {
    assert!(matches!(
      import_rubric(r#"{"rubric": []}"#, None),
      Err(Error::UnexpectedJsonShape)
    ));
    assert!(matches!(
      import_rubric("42", Some(RubricFormat::Json)),
      Err(Error::UnexpectedJsonShape)
    ));
    assert!(matches!(import_rubric("[1, 2", None), Err(Error::Json(_))));
  }
}
