//! CSV rubric files.

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::{
  Collector, Error, Result, RubricImport,
  columns::ColumnMap,
  parse_points,
};

pub(crate) fn import(input: &str) -> Result<RubricImport> {
  let mut reader = ReaderBuilder::new()
    .has_headers(false)
    .flexible(true)
    .trim(Trim::All)
    .from_reader(input.as_bytes());

  let mut collector = Collector::default();
  let mut columns: Option<ColumnMap> = None;

  for record in reader.records() {
    let record = record?;
    if record.iter().all(str::is_empty) {
      continue;
    }
    let line = record.position().map(|p| p.line()).unwrap_or_default();

    let map = match columns {
      Some(map) => map,
      None => {
        let (map, is_data) = detect_layout(&record)?;
        columns = Some(map);
        if !is_data {
          continue;
        }
        map
      }
    };

    collector.accept(
      line,
      map.category.and_then(|i| record.get(i)),
      map.points.and_then(|i| record.get(i)).filter(|c| !c.is_empty()),
      map.description.and_then(|i| record.get(i)),
    );
  }

  Ok(collector.finish(None, None))
}

/// Work out the column layout from the first non-empty record. The returned
/// flag is `true` when that record is data rather than a header.
///
/// A record whose second cell is a number is only a header when exact names
/// give both the category and points columns.
fn detect_layout(first: &StringRecord) -> Result<(ColumnMap, bool)> {
  if first.get(1).is_some_and(looks_numeric) {
    let exact = ColumnMap::exact_from_headers(first.iter());
    return Ok(match (exact.category, exact.points) {
      (Some(_), Some(_)) => (exact, false),
      _ => (ColumnMap::HEADERLESS, true),
    });
  }
  let map = ColumnMap::from_headers(first.iter());
  match (map.category, map.points) {
    (Some(_), Some(_)) => Ok((map, false)),
    (None, None) => Err(Error::UnrecognisedHeader),
    (None, Some(_)) => Err(Error::MissingColumn("category")),
    (Some(_), None) => Err(Error::MissingColumn("points")),
  }
}

fn looks_numeric(cell: &str) -> bool {
  parse_points(cell).is_ok() || cell.trim().parse::<f64>().is_ok()
}

#[cfg(test)]
mod tests {
  use crate::{Error, RubricFormat, import_rubric};

  fn csv(input: &str) -> crate::Result<crate::RubricImport> {
    import_rubric(input, Some(RubricFormat::Csv))
  }

  #[test]
  fn imports_rows_with_recognised_headers() {
    let import = csv(
      "Criterion,Max Marks,Descriptor\n\
       Argument,10,Clear thesis\n\
       Evidence,8,\n\
       Style,5 pts,Varied sentences\n",
    )
    .unwrap();

    let names: Vec<_> = import.criteria.iter().map(|c| c.category.as_str()).collect();
    assert_eq!(names, ["Argument", "Evidence", "Style"]);
    assert_eq!(import.criteria[0].max_points, 10);
    assert_eq!(import.criteria[0].description.as_deref(), Some("Clear thesis"));
    assert_eq!(import.criteria[1].description, None);
    assert_eq!(import.criteria[2].max_points, 5);
    assert!(import.skipped.is_empty());
  }

  #[test]
  fn columns_may_appear_in_any_order() {
    let import = csv("notes,out of,AO\nUse quotes,6,AO2\n").unwrap();
    assert_eq!(import.criteria[0].category, "AO2");
    assert_eq!(import.criteria[0].max_points, 6);
    assert_eq!(import.criteria[0].description.as_deref(), Some("Use quotes"));
  }

  #[test]
  fn skips_malformed_rows_with_line_numbers() {
    let import = csv(
      "Category,Points\n\
       Thesis,10\n\
       ,4\n\
       Structure,zero\n\
       Evidence,-2\n\
       Grammar,2.5\n\
       thesis,3\n\
       Voice\n\
       Vocabulary,4\n",
    )
    .unwrap();

    let names: Vec<_> = import.criteria.iter().map(|c| c.category.as_str()).collect();
    assert_eq!(names, ["Thesis", "Vocabulary"]);

    let rows: Vec<_> = import.skipped.iter().map(|s| s.row).collect();
    assert_eq!(rows, [3, 4, 5, 6, 7, 8]);
    assert_eq!(import.skipped[0].reason, "missing category");
    assert_eq!(import.skipped[1].reason, "\"Structure\": points are not a number");
    assert!(import.skipped[4].reason.contains("duplicate"));
    assert!(import.skipped[5].reason.contains("missing points"));
  }

  #[test]
  fn headerless_file_is_read_as_category_then_points() {
    let import = csv("Analysis,12\nComparison,8\n").unwrap();
    assert_eq!(import.criteria.len(), 2);
    assert_eq!(import.criteria[0].category, "Analysis");
    assert_eq!(import.criteria[1].max_points, 8);
  }

  #[test]
  fn headerless_categories_that_contain_header_words() {
    let import = csv("Reading skills,10\nWriting,8\n").unwrap();
    let names: Vec<_> = import.criteria.iter().map(|c| c.category.as_str()).collect();
    assert_eq!(names, ["Reading skills", "Writing"]);
    assert_eq!(import.criteria[0].max_points, 10);

    let import = csv("Total understanding,6 pts,Explains causes\n").unwrap();
    assert_eq!(import.criteria[0].category, "Total understanding");
    assert_eq!(import.criteria[0].description.as_deref(), Some("Explains causes"));
  }

  #[test]
  fn blank_lines_are_ignored() {
    let import = csv("\nCategory,Points\n\n,\nThesis,10\n").unwrap();
    assert_eq!(import.criteria.len(), 1);
    assert!(import.skipped.is_empty());
  }

  #[test]
  fn header_missing_one_role_fails() {
    assert!(matches!(
      csv("Category,Comment\nThesis,good\n"),
      Err(Error::MissingColumn("points"))
    ));
    assert!(matches!(
      csv("Foo,Marks\nThesis,4\n"),
      Err(Error::MissingColumn("category"))
    ));
    assert!(matches!(csv("Foo,Bar\nx,y\n"), Err(Error::UnrecognisedHeader)));
  }

  #[test]
  fn quoted_cells_keep_commas() {
    let import = csv("Category,Points,Description\n\"Spelling, punctuation\",4,\"Accurate, mostly\"\n").unwrap();
    assert_eq!(import.criteria[0].category, "Spelling, punctuation");
    assert_eq!(import.criteria[0].description.as_deref(), Some("Accurate, mostly"));
  }
}
