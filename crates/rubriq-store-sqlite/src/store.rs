//! [`SqliteStore`], the SQLite implementation of [`GradingStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use rubriq_core::{
  Error as CoreError,
  essay::{Essay, EssayStatus, NewEssay, word_count},
  feedback::{Feedback, FeedbackDraft},
  profile::{
    Credentials, NewProfile, NewSubscription, Profile, Subscription,
    effective_plan, normalize_email,
  },
  rubric::{NewRubric, Rubric, RubricClone},
  store::{EssayQuery, GradingStore},
  student::{NewStudent, Student},
};

use crate::{
  encode::{
    ESSAY_COLUMNS, FEEDBACK_COLUMNS, PROFILE_COLUMNS, RUBRIC_COLUMNS,
    RawEssay, RawFeedback, RawProfile, RawRubric, RawStudent, RawSubscription,
    STUDENT_COLUMNS, SUBSCRIPTION_COLUMNS, encode_criteria,
    encode_criterion_scores, encode_dt, encode_strings, encode_uuid,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Rubriq store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert a fully-built [`Rubric`] into the `rubrics` table.
  async fn insert_rubric(&self, rubric: &Rubric) -> Result<()> {
    let rubric_id_str  = encode_uuid(rubric.rubric_id);
    let teacher_id_str = encode_uuid(rubric.teacher_id);
    let name           = rubric.name.clone();
    let subject        = rubric.subject.clone();
    let exam_board     = rubric.exam_board.clone();
    let scale_str      = rubric.grading_scale.as_str();
    let criteria_str   = encode_criteria(&rubric.criteria)?;
    let version        = i64::from(rubric.version);
    let parent_id_str  = rubric.parent_id.map(encode_uuid);
    let created_at_str = encode_dt(rubric.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO rubrics (
             rubric_id, teacher_id, name, subject, exam_board,
             grading_scale, criteria_json, version, parent_id, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            rubric_id_str,
            teacher_id_str,
            name,
            subject,
            exam_board,
            scale_str,
            criteria_str,
            version,
            parent_id_str,
            created_at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a `DELETE` scoped to one teacher; returns whether a row went away.
  async fn delete_owned(
    &self,
    sql: &'static str,
    teacher_id: Uuid,
    id: Uuid,
  ) -> Result<bool> {
    let teacher_id_str = encode_uuid(teacher_id);
    let id_str         = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(sql, rusqlite::params![id_str, teacher_id_str])?)
      })
      .await?;
    Ok(deleted > 0)
  }
}

// ─── GradingStore impl ───────────────────────────────────────────────────────

impl GradingStore for SqliteStore {
  type Error = Error;

  // ── Profiles & billing ────────────────────────────────────────────────────

  async fn add_profile(&self, input: NewProfile) -> Result<Profile> {
    let profile = Profile {
      profile_id:   Uuid::new_v4(),
      email:        normalize_email(&input.email),
      display_name: input.display_name.trim().to_owned(),
      plan:         input.plan,
      created_at:   Utc::now(),
    };

    let id_str    = encode_uuid(profile.profile_id);
    let email     = profile.email.clone();
    let name      = profile.display_name.clone();
    let plan_str  = profile.plan.as_str();
    let hash      = input.password_hash;
    let at_str    = encode_dt(profile.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let taken: bool = conn
          .query_row(
            "SELECT 1 FROM profiles WHERE email = ?1",
            rusqlite::params![email],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(false);
        }

        conn.execute(
          "INSERT INTO profiles (profile_id, email, display_name, plan, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, email, name, plan_str, hash, at_str],
        )?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(Error::EmailTaken(profile.email));
    }
    Ok(profile)
  }

  async fn get_profile(&self, profile_id: Uuid) -> Result<Option<Profile>> {
    let id_str = encode_uuid(profile_id);

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE profile_id = ?1"),
            rusqlite::params![id_str],
            RawProfile::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn find_profile_by_email(&self, email: String) -> Result<Option<Profile>> {
    let email = normalize_email(&email);

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE email = ?1"),
            rusqlite::params![email],
            RawProfile::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn get_credentials(&self, email: String) -> Result<Option<Credentials>> {
    let email = normalize_email(&email);

    let raw: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT profile_id, password_hash FROM profiles WHERE email = ?1",
            rusqlite::params![email],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?)
      })
      .await?;

    raw
      .map(|(id, password_hash)| -> Result<Credentials> {
        Ok(Credentials { profile_id: Uuid::parse_str(&id)?, password_hash })
      })
      .transpose()
  }

  async fn record_subscription(&self, input: NewSubscription) -> Result<Subscription> {
    let subscription = Subscription {
      subscription_id:    Uuid::new_v4(),
      profile_id:         input.profile_id,
      plan:               input.plan,
      status:             input.status,
      external_ref:       input.external_ref,
      current_period_end: input.current_period_end,
      recorded_at:        Utc::now(),
    };

    let sub_id_str     = encode_uuid(subscription.subscription_id);
    let profile_id_str = encode_uuid(subscription.profile_id);
    let plan_str       = subscription.plan.as_str();
    let status_str     = subscription.status.as_str();
    let effective_str  = effective_plan(subscription.plan, subscription.status).as_str();
    let external_ref   = subscription.external_ref.clone();
    let period_end_str = subscription.current_period_end.map(encode_dt);
    let at_str         = encode_dt(subscription.recorded_at);

    let found = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let updated = tx.execute(
          "UPDATE profiles SET plan = ?1 WHERE profile_id = ?2",
          rusqlite::params![effective_str, profile_id_str],
        )?;
        if updated == 0 {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO subscriptions (
             subscription_id, profile_id, plan, status,
             external_ref, current_period_end, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            sub_id_str,
            profile_id_str,
            plan_str,
            status_str,
            external_ref,
            period_end_str,
            at_str,
          ],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !found {
      return Err(Error::Core(CoreError::ProfileNotFound(subscription.profile_id)));
    }
    Ok(subscription)
  }

  async fn current_subscription(&self, profile_id: Uuid) -> Result<Option<Subscription>> {
    let id_str = encode_uuid(profile_id);

    let raw: Option<RawSubscription> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
               WHERE profile_id = ?1
               ORDER BY recorded_at DESC, rowid DESC
               LIMIT 1"
            ),
            rusqlite::params![id_str],
            RawSubscription::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSubscription::into_subscription).transpose()
  }

  async fn record_usage(&self, teacher_id: Uuid, essay_id: Option<Uuid>) -> Result<()> {
    let usage_id_str   = encode_uuid(Uuid::new_v4());
    let teacher_id_str = encode_uuid(teacher_id);
    let essay_id_str   = essay_id.map(encode_uuid);
    let at_str         = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO usage_events (usage_id, teacher_id, essay_id, recorded_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![usage_id_str, teacher_id_str, essay_id_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn count_usage_since(&self, teacher_id: Uuid, since: DateTime<Utc>) -> Result<u32> {
    let teacher_id_str = encode_uuid(teacher_id);
    let since_str      = encode_dt(since);

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM usage_events WHERE teacher_id = ?1 AND recorded_at >= ?2",
          rusqlite::params![teacher_id_str, since_str],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(u32::try_from(count).unwrap_or(u32::MAX))
  }

  // ── Students ──────────────────────────────────────────────────────────────

  async fn add_student(&self, teacher_id: Uuid, input: NewStudent) -> Result<Student> {
    let input = input.normalized()?;
    let student = Student {
      student_id: Uuid::new_v4(),
      teacher_id,
      name:       input.name,
      class_name: input.class_name,
      created_at: Utc::now(),
    };

    let id_str         = encode_uuid(student.student_id);
    let teacher_id_str = encode_uuid(teacher_id);
    let name           = student.name.clone();
    let class_name     = student.class_name.clone();
    let at_str         = encode_dt(student.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO students (student_id, teacher_id, name, class_name, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, teacher_id_str, name, class_name, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(student)
  }

  async fn get_student(&self, teacher_id: Uuid, student_id: Uuid) -> Result<Option<Student>> {
    let teacher_id_str = encode_uuid(teacher_id);
    let id_str         = encode_uuid(student_id);

    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {STUDENT_COLUMNS} FROM students WHERE student_id = ?1 AND teacher_id = ?2"
            ),
            rusqlite::params![id_str, teacher_id_str],
            RawStudent::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawStudent::into_student).transpose()
  }

  async fn list_students(&self, teacher_id: Uuid) -> Result<Vec<Student>> {
    let teacher_id_str = encode_uuid(teacher_id);

    let raws: Vec<RawStudent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {STUDENT_COLUMNS} FROM students
           WHERE teacher_id = ?1
           ORDER BY name COLLATE NOCASE, created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![teacher_id_str], RawStudent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStudent::into_student).collect()
  }

  async fn delete_student(&self, teacher_id: Uuid, student_id: Uuid) -> Result<bool> {
    self
      .delete_owned(
        "DELETE FROM students WHERE student_id = ?1 AND teacher_id = ?2",
        teacher_id,
        student_id,
      )
      .await
  }

  // ── Rubrics ───────────────────────────────────────────────────────────────

  async fn add_rubric(&self, teacher_id: Uuid, input: NewRubric) -> Result<Rubric> {
    let input = input.normalized()?;
    let rubric = Rubric {
      rubric_id:     Uuid::new_v4(),
      teacher_id,
      name:          input.name,
      subject:       input.subject,
      exam_board:    input.exam_board,
      grading_scale: input.grading_scale,
      criteria:      input.criteria,
      version:       1,
      parent_id:     None,
      created_at:    Utc::now(),
    };

    self.insert_rubric(&rubric).await?;
    Ok(rubric)
  }

  async fn get_rubric(&self, teacher_id: Uuid, rubric_id: Uuid) -> Result<Option<Rubric>> {
    let teacher_id_str = encode_uuid(teacher_id);
    let id_str         = encode_uuid(rubric_id);

    let raw: Option<RawRubric> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {RUBRIC_COLUMNS} FROM rubrics WHERE rubric_id = ?1 AND teacher_id = ?2"
            ),
            rusqlite::params![id_str, teacher_id_str],
            RawRubric::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawRubric::into_rubric).transpose()
  }

  async fn list_rubrics(&self, teacher_id: Uuid) -> Result<Vec<Rubric>> {
    let teacher_id_str = encode_uuid(teacher_id);

    let raws: Vec<RawRubric> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RUBRIC_COLUMNS} FROM rubrics
           WHERE teacher_id = ?1
           ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![teacher_id_str], RawRubric::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRubric::into_rubric).collect()
  }

  async fn clone_rubric(
    &self,
    teacher_id: Uuid,
    rubric_id:  Uuid,
    options:    RubricClone,
  ) -> Result<Option<Rubric>> {
    let Some(source) = self.get_rubric(teacher_id, rubric_id).await? else {
      return Ok(None);
    };

    let name = options
      .name
      .map(|n| n.trim().to_owned())
      .filter(|n| !n.is_empty())
      .unwrap_or_else(|| source.name.clone());

    let rubric = Rubric {
      rubric_id: Uuid::new_v4(),
      name,
      version: source.version.saturating_add(1),
      parent_id: Some(source.rubric_id),
      created_at: Utc::now(),
      ..source
    };

    self.insert_rubric(&rubric).await?;
    Ok(Some(rubric))
  }

  async fn delete_rubric(&self, teacher_id: Uuid, rubric_id: Uuid) -> Result<bool> {
    self
      .delete_owned(
        "DELETE FROM rubrics WHERE rubric_id = ?1 AND teacher_id = ?2",
        teacher_id,
        rubric_id,
      )
      .await
  }

  // ── Essays ────────────────────────────────────────────────────────────────

  async fn add_essay(&self, teacher_id: Uuid, input: NewEssay) -> Result<Essay> {
    let input = input.normalized()?;

    if let Some(rubric_id) = input.rubric_id
      && self.get_rubric(teacher_id, rubric_id).await?.is_none()
    {
      return Err(Error::Core(CoreError::RubricNotFound(rubric_id)));
    }
    if let Some(student_id) = input.student_id
      && self.get_student(teacher_id, student_id).await?.is_none()
    {
      return Err(Error::Core(CoreError::StudentNotFound(student_id)));
    }

    let essay = Essay {
      essay_id:   Uuid::new_v4(),
      teacher_id,
      word_count: word_count(&input.content),
      title:      input.title,
      content:    input.content,
      rubric_id:  input.rubric_id,
      student_id: input.student_id,
      status:     EssayStatus::Pending,
      created_at: Utc::now(),
    };

    let id_str         = encode_uuid(essay.essay_id);
    let teacher_id_str = encode_uuid(teacher_id);
    let title          = essay.title.clone();
    let content        = essay.content.clone();
    let words          = i64::from(essay.word_count);
    let rubric_id_str  = essay.rubric_id.map(encode_uuid);
    let student_id_str = essay.student_id.map(encode_uuid);
    let status_str     = essay.status.as_str();
    let at_str         = encode_dt(essay.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO essays (
             essay_id, teacher_id, title, content, word_count,
             rubric_id, student_id, status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str,
            teacher_id_str,
            title,
            content,
            words,
            rubric_id_str,
            student_id_str,
            status_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(essay)
  }

  async fn get_essay(&self, teacher_id: Uuid, essay_id: Uuid) -> Result<Option<Essay>> {
    let teacher_id_str = encode_uuid(teacher_id);
    let id_str         = encode_uuid(essay_id);

    let raw: Option<RawEssay> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {ESSAY_COLUMNS} FROM essays WHERE essay_id = ?1 AND teacher_id = ?2"
            ),
            rusqlite::params![id_str, teacher_id_str],
            RawEssay::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawEssay::into_essay).transpose()
  }

  async fn list_essays(&self, teacher_id: Uuid, query: &EssayQuery) -> Result<Vec<Essay>> {
    let teacher_id_str = encode_uuid(teacher_id);
    let student_id_str = query.student_id.map(encode_uuid);
    let rubric_id_str  = query.rubric_id.map(encode_uuid);
    let status_str     = query.status.map(EssayStatus::as_str);
    let limit_val      = query.limit.unwrap_or(100) as i64;
    let offset_val     = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawEssay> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ESSAY_COLUMNS} FROM essays
           WHERE teacher_id = ?1
             AND (?2 IS NULL OR student_id = ?2)
             AND (?3 IS NULL OR rubric_id = ?3)
             AND (?4 IS NULL OR status = ?4)
           ORDER BY created_at DESC, rowid DESC
           LIMIT ?5 OFFSET ?6"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              teacher_id_str,
              student_id_str,
              rubric_id_str,
              status_str,
              limit_val,
              offset_val,
            ],
            RawEssay::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEssay::into_essay).collect()
  }

  async fn set_essay_status(
    &self,
    teacher_id: Uuid,
    essay_id:   Uuid,
    status:     EssayStatus,
  ) -> Result<bool> {
    let teacher_id_str = encode_uuid(teacher_id);
    let id_str         = encode_uuid(essay_id);
    let status_str     = status.as_str();

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE essays SET status = ?1 WHERE essay_id = ?2 AND teacher_id = ?3",
          rusqlite::params![status_str, id_str, teacher_id_str],
        )?)
      })
      .await?;

    Ok(updated > 0)
  }

  async fn delete_essay(&self, teacher_id: Uuid, essay_id: Uuid) -> Result<bool> {
    self
      .delete_owned(
        "DELETE FROM essays WHERE essay_id = ?1 AND teacher_id = ?2",
        teacher_id,
        essay_id,
      )
      .await
  }

  // ── Feedback ──────────────────────────────────────────────────────────────

  async fn save_feedback(
    &self,
    teacher_id: Uuid,
    essay_id:   Uuid,
    draft:      FeedbackDraft,
  ) -> Result<Feedback> {
    let feedback = Feedback {
      feedback_id: Uuid::new_v4(),
      essay_id,
      draft,
      created_at:  Utc::now(),
    };

    let feedback_id_str = encode_uuid(feedback.feedback_id);
    let essay_id_str    = encode_uuid(essay_id);
    let teacher_id_str  = encode_uuid(teacher_id);
    let summary         = feedback.draft.summary.clone();
    let strengths_str   = encode_strings(&feedback.draft.strengths)?;
    let improvements_str = encode_strings(&feedback.draft.improvements)?;
    let grammar_str     = encode_strings(&feedback.draft.grammar_issues)?;
    let score_awarded   = feedback.draft.score.map(|s| s.awarded);
    let score_out_of    = feedback.draft.score.map(|s| s.out_of);
    let criteria_str    = encode_criterion_scores(&feedback.draft.criterion_scores)?;
    let band            = feedback.draft.band.map(i64::from);
    let model           = feedback.draft.model.clone();
    let raw_text        = feedback.draft.raw_text.clone();
    let at_str          = encode_dt(feedback.created_at);

    let owned = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let owned: bool = tx
          .query_row(
            "SELECT 1 FROM essays WHERE essay_id = ?1 AND teacher_id = ?2",
            rusqlite::params![essay_id_str, teacher_id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !owned {
          return Ok(false);
        }

        tx.execute(
          "DELETE FROM feedback WHERE essay_id = ?1",
          rusqlite::params![essay_id_str],
        )?;
        tx.execute(
          "INSERT INTO feedback (
             feedback_id, essay_id, summary, strengths_json, improvements_json,
             grammar_issues_json, score_awarded, score_out_of,
             criterion_scores_json, band, model, raw_text, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
          rusqlite::params![
            feedback_id_str,
            essay_id_str,
            summary,
            strengths_str,
            improvements_str,
            grammar_str,
            score_awarded,
            score_out_of,
            criteria_str,
            band,
            model,
            raw_text,
            at_str,
          ],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !owned {
      return Err(Error::Core(CoreError::EssayNotFound(essay_id)));
    }
    Ok(feedback)
  }

  async fn get_feedback(&self, teacher_id: Uuid, essay_id: Uuid) -> Result<Option<Feedback>> {
    let teacher_id_str = encode_uuid(teacher_id);
    let essay_id_str   = encode_uuid(essay_id);

    let raw: Option<RawFeedback> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {FEEDBACK_COLUMNS}
               FROM feedback f
               JOIN essays e ON e.essay_id = f.essay_id
               WHERE f.essay_id = ?1 AND e.teacher_id = ?2"
            ),
            rusqlite::params![essay_id_str, teacher_id_str],
            RawFeedback::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawFeedback::into_feedback).transpose()
  }
}
