//! Header-name guessing.
//!
//! Header cells are normalised (lower-cased, everything but ASCII letters and
//! digits removed) and compared against a synonym table per role. Exact
//! matches are tried for every role before any substring match, so a
//! `Criterion Description` column does not steal the category role from a
//! plain `Criterion` column.

/// What a column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
  Category,
  Points,
  Description,
}

const CATEGORY: &[&str] = &[
  "category",
  "criterion",
  "criteria",
  "name",
  "criterionname",
  "area",
  "skill",
  "objective",
  "assessmentobjective",
  "ao",
  "strand",
];

const POINTS: &[&str] = &[
  "maxpoints",
  "max",
  "points",
  "marks",
  "maxmarks",
  "maximum",
  "outof",
  "score",
  "maxscore",
  "weight",
  "total",
];

const DESCRIPTION: &[&str] = &["description", "descriptor", "details", "notes", "guidance"];

impl Role {
  const ALL: [Role; 3] = [Role::Category, Role::Points, Role::Description];

  fn synonyms(self) -> &'static [&'static str] {
    match self {
      Self::Category => CATEGORY,
      Self::Points => POINTS,
      Self::Description => DESCRIPTION,
    }
  }
}

/// Lower-case and strip everything but ASCII alphanumerics.
pub fn normalize(header: &str) -> String {
  header
    .chars()
    .filter(char::is_ascii_alphanumeric)
    .map(|c| c.to_ascii_lowercase())
    .collect()
}

/// The role of a single key, by exact synonym match only. Used for JSON
/// object keys, where substring guessing would be too loose.
pub fn role_of_key(key: &str) -> Option<Role> {
  let key = normalize(key);
  Role::ALL
    .into_iter()
    .find(|role| role.synonyms().contains(&key.as_str()))
}

/// Column indices for each role, as guessed from a header row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnMap {
  pub category:    Option<usize>,
  pub points:      Option<usize>,
  pub description: Option<usize>,
}

impl ColumnMap {
  /// The layout assumed for a file without a header row.
  pub const HEADERLESS: Self = Self {
    category:    Some(0),
    points:      Some(1),
    description: Some(2),
  };

  pub fn from_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
    Self::guess(headers, true)
  }

  /// Like [`from_headers`](Self::from_headers) without the substring pass.
  pub fn exact_from_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
    Self::guess(headers, false)
  }

  fn guess<'a>(headers: impl IntoIterator<Item = &'a str>, substrings: bool) -> Self {
    let normalized: Vec<String> = headers.into_iter().map(normalize).collect();
    let mut map = Self::default();
    let mut taken = vec![false; normalized.len()];

    // Exact matches first, for every role.
    map.assign(&normalized, &mut taken, |role, h| role.synonyms().contains(&h));

    // Then substring matches for roles still unassigned.
    if substrings {
      map.assign(&normalized, &mut taken, |role, h| {
        role.synonyms().iter().any(|syn| syn.len() >= 4 && h.contains(syn))
      });
    }

    map
  }

  fn assign(
    &mut self,
    normalized: &[String],
    taken: &mut [bool],
    matches: impl Fn(Role, &str) -> bool,
  ) {
    for role in Role::ALL {
      if self.get(role).is_some() {
        continue;
      }
      let found = normalized
        .iter()
        .enumerate()
        .find(|(i, h)| !taken[*i] && matches(role, h.as_str()))
        .map(|(i, _)| i);
      if let Some(i) = found {
        taken[i] = true;
        self.set(role, i);
      }
    }
  }

  pub fn get(&self, role: Role) -> Option<usize> {
    match role {
      Role::Category => self.category,
      Role::Points => self.points,
      Role::Description => self.description,
    }
  }

  fn set(&mut self, role: Role, index: usize) {
    match role {
      Role::Category => self.category = Some(index),
      Role::Points => self.points = Some(index),
      Role::Description => self.description = Some(index),
    }
  }
}
