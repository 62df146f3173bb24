//! Students on a teacher's roster.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
  pub student_id: Uuid,
  pub teacher_id: Uuid,
  pub name:       String,
  pub class_name: Option<String>,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::GradingStore::add_student`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewStudent {
  pub name:       String,
  pub class_name: Option<String>,
}

impl NewStudent {
  /// Trim fields and reject a blank name. Blank class names become `None`.
  pub fn normalized(self) -> Result<Self> {
    let name = self.name.trim().to_owned();
    if name.is_empty() {
      return Err(Error::InvalidStudent("name must not be empty".into()));
    }
    let class_name = self
      .class_name
      .map(|c| c.trim().to_owned())
      .filter(|c| !c.is_empty());
    Ok(Self { name, class_name })
  }
}
