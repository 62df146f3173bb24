//! The `GradingStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `rubriq-store-sqlite`).
//! Higher layers (`rubriq-api`, `rubriq-server`) depend on this abstraction,
//! not on any concrete backend.
//!
//! Every read and write of teacher-owned rows takes the owning teacher's id.
//! A row belonging to another teacher behaves exactly like a missing row.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  essay::{Essay, EssayStatus, NewEssay},
  feedback::{Feedback, FeedbackDraft},
  profile::{Credentials, NewProfile, NewSubscription, Profile, Subscription},
  rubric::{NewRubric, Rubric, RubricClone},
  student::{NewStudent, Student},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Filters for [`GradingStore::list_essays`]. Results are newest first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EssayQuery {
  pub student_id: Option<Uuid>,
  pub rubric_id:  Option<Uuid>,
  pub status:     Option<EssayStatus>,
  pub limit:      Option<usize>,
  pub offset:     Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Rubriq store backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait GradingStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Profiles & billing ────────────────────────────────────────────────

  /// Create a teacher profile. Fails if the email is already registered.
  fn add_profile(
    &self,
    input: NewProfile,
  ) -> impl Future<Output = Result<Profile, Self::Error>> + Send + '_;

  fn get_profile(
    &self,
    profile_id: Uuid,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  fn find_profile_by_email(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  /// Look up login material by (case-insensitive) email.
  fn get_credentials(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + '_;

  /// Append a subscription record and set the profile's plan to its
  /// effective plan, atomically.
  fn record_subscription(
    &self,
    input: NewSubscription,
  ) -> impl Future<Output = Result<Subscription, Self::Error>> + Send + '_;

  /// The most recently recorded subscription for a profile.
  fn current_subscription(
    &self,
    profile_id: Uuid,
  ) -> impl Future<Output = Result<Option<Subscription>, Self::Error>> + Send + '_;

  /// Append one usage row for a completed grading.
  fn record_usage(
    &self,
    teacher_id: Uuid,
    essay_id: Option<Uuid>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Number of usage rows recorded at or after `since`.
  fn count_usage_since(
    &self,
    teacher_id: Uuid,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<u32, Self::Error>> + Send + '_;

  // ── Students ──────────────────────────────────────────────────────────

  fn add_student(
    &self,
    teacher_id: Uuid,
    input: NewStudent,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  fn get_student(
    &self,
    teacher_id: Uuid,
    student_id: Uuid,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  /// All of a teacher's students, ordered by name.
  fn list_students(
    &self,
    teacher_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Student>, Self::Error>> + Send + '_;

  /// Delete a student; their essays are kept with `student_id` cleared.
  /// Returns `false` if no such student exists for this teacher.
  fn delete_student(
    &self,
    teacher_id: Uuid,
    student_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Rubrics ───────────────────────────────────────────────────────────

  /// Persist a new rubric at version 1.
  fn add_rubric(
    &self,
    teacher_id: Uuid,
    input: NewRubric,
  ) -> impl Future<Output = Result<Rubric, Self::Error>> + Send + '_;

  fn get_rubric(
    &self,
    teacher_id: Uuid,
    rubric_id: Uuid,
  ) -> impl Future<Output = Result<Option<Rubric>, Self::Error>> + Send + '_;

  /// All of a teacher's rubrics, newest first.
  fn list_rubrics(
    &self,
    teacher_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Rubric>, Self::Error>> + Send + '_;

  /// Copy a rubric into a new version whose `parent_id` is the source.
  /// Returns `None` if the source does not exist for this teacher.
  fn clone_rubric(
    &self,
    teacher_id: Uuid,
    rubric_id: Uuid,
    options: RubricClone,
  ) -> impl Future<Output = Result<Option<Rubric>, Self::Error>> + Send + '_;

  /// Delete a rubric; essays referencing it keep existing with `rubric_id`
  /// cleared.
  fn delete_rubric(
    &self,
    teacher_id: Uuid,
    rubric_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Essays ────────────────────────────────────────────────────────────

  /// Persist an essay with status `pending` and a computed word count.
  ///
  /// Fails if a referenced rubric or student does not belong to the teacher.
  fn add_essay(
    &self,
    teacher_id: Uuid,
    input: NewEssay,
  ) -> impl Future<Output = Result<Essay, Self::Error>> + Send + '_;

  fn get_essay(
    &self,
    teacher_id: Uuid,
    essay_id: Uuid,
  ) -> impl Future<Output = Result<Option<Essay>, Self::Error>> + Send + '_;

  fn list_essays<'a>(
    &'a self,
    teacher_id: Uuid,
    query: &'a EssayQuery,
  ) -> impl Future<Output = Result<Vec<Essay>, Self::Error>> + Send + 'a;

  /// Returns `false` if no such essay exists for this teacher.
  fn set_essay_status(
    &self,
    teacher_id: Uuid,
    essay_id: Uuid,
    status: EssayStatus,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Delete an essay and its feedback.
  fn delete_essay(
    &self,
    teacher_id: Uuid,
    essay_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Feedback ──────────────────────────────────────────────────────────

  /// Store feedback for an essay, replacing any earlier feedback.
  fn save_feedback(
    &self,
    teacher_id: Uuid,
    essay_id: Uuid,
    draft: FeedbackDraft,
  ) -> impl Future<Output = Result<Feedback, Self::Error>> + Send + '_;

  fn get_feedback(
    &self,
    teacher_id: Uuid,
    essay_id: Uuid,
  ) -> impl Future<Output = Result<Option<Feedback>, Self::Error>> + Send + '_;
}
