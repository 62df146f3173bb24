//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use rubriq_core::{
  essay::{EssayStatus, NewEssay},
  feedback::{CriterionScore, FeedbackDraft, Score},
  profile::{NewProfile, NewSubscription, Plan, Profile, SubscriptionStatus},
  rubric::{Criterion, GradingScale, NewRubric, RubricClone},
  store::{EssayQuery, GradingStore},
  student::NewStudent,
};
use uuid::Uuid;

use crate::{Error, SqliteStore};
use rubriq_core::Error as CoreError;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn teacher(s: &SqliteStore, email: &str) -> Profile {
  s.add_profile(NewProfile {
    email:         email.into(),
    display_name:  "Ms Example".into(),
    password_hash: "$argon2id$placeholder".into(),
    plan:          Plan::Free,
  })
  .await
  .unwrap()
}

fn rubric_input() -> NewRubric {
  NewRubric {
    name:          "Argument essay".into(),
    subject:       "English".into(),
    exam_board:    Some("AQA".into()),
    grading_scale: GradingScale::GcseBand,
    criteria:      vec![Criterion::new("Thesis", 10), Criterion::new("Evidence", 20)],
  }
}

fn essay_input(title: &str) -> NewEssay {
  NewEssay {
    title:      title.into(),
    content:    "Schools should start later because teenagers need sleep.".into(),
    rubric_id:  None,
    student_id: None,
  }
}

fn draft(summary: &str) -> FeedbackDraft {
  FeedbackDraft {
    summary:          summary.into(),
    strengths:        vec!["Clear thesis".into()],
    improvements:     vec!["Cite sources".into()],
    grammar_issues:   vec!["Comma splice in paragraph 2".into()],
    score:            Score::clamped(21.0, 30.0),
    criterion_scores: vec![CriterionScore {
      category:   "Thesis".into(),
      awarded:    8.0,
      max_points: 10,
    }],
    band:             Some(4),
    model:            "gpt-4o-mini".into(),
    raw_text:         "Strengths:\n- Clear thesis".into(),
  }
}

// ─── Profiles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn profile_email_is_normalized_and_unique() {
  let s = store().await;
  let p = teacher(&s, "  Teacher@School.org").await;
  assert_eq!(p.email, "teacher@school.org");

  let dup = s
    .add_profile(NewProfile {
      email:         "TEACHER@school.org".into(),
      display_name:  "Other".into(),
      password_hash: "x".into(),
      plan:          Plan::Free,
    })
    .await;
  assert!(matches!(dup, Err(Error::EmailTaken(_))));

  let creds = s.get_credentials("teacher@SCHOOL.org".into()).await.unwrap().unwrap();
  assert_eq!(creds.profile_id, p.profile_id);
  assert_eq!(creds.password_hash, "$argon2id$placeholder");

  let found = s.find_profile_by_email("Teacher@School.org".into()).await.unwrap();
  assert_eq!(found.map(|f| f.profile_id), Some(p.profile_id));
}

#[tokio::test]
async fn subscription_flips_plan() {
  let s = store().await;
  let p = teacher(&s, "a@example.com").await;

  s.record_subscription(NewSubscription {
    profile_id:         p.profile_id,
    plan:               Plan::Pro,
    status:             SubscriptionStatus::Active,
    external_ref:       Some("sub_123".into()),
    current_period_end: Some(Utc::now() + Duration::days(30)),
  })
  .await
  .unwrap();
  let profile = s.get_profile(p.profile_id).await.unwrap().unwrap();
  assert_eq!(profile.plan, Plan::Pro);

  s.record_subscription(NewSubscription {
    profile_id:         p.profile_id,
    plan:               Plan::Pro,
    status:             SubscriptionStatus::Canceled,
    external_ref:       Some("sub_123".into()),
    current_period_end: None,
  })
  .await
  .unwrap();
  let profile = s.get_profile(p.profile_id).await.unwrap().unwrap();
  assert_eq!(profile.plan, Plan::Free);

  let current = s.current_subscription(p.profile_id).await.unwrap().unwrap();
  assert_eq!(current.status, SubscriptionStatus::Canceled);
}

#[tokio::test]
async fn subscription_for_missing_profile_fails() {
  let s = store().await;
  let missing = Uuid::new_v4();
  let result = s
    .record_subscription(NewSubscription {
      profile_id:         missing,
      plan:               Plan::School,
      status:             SubscriptionStatus::Active,
      external_ref:       None,
      current_period_end: None,
    })
    .await;
  assert!(matches!(result, Err(Error::Core(CoreError::ProfileNotFound(id))) if id == missing));
}

#[tokio::test]
async fn usage_is_counted_from_a_cutoff() {
  let s = store().await;
  let p = teacher(&s, "a@example.com").await;
  let before = Utc::now() - Duration::seconds(1);

  s.record_usage(p.profile_id, None).await.unwrap();
  s.record_usage(p.profile_id, Some(Uuid::new_v4())).await.unwrap();

  assert_eq!(s.count_usage_since(p.profile_id, before).await.unwrap(), 2);
  let later = Utc::now() + Duration::hours(1);
  assert_eq!(s.count_usage_since(p.profile_id, later).await.unwrap(), 0);
}

// ─── Students ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn students_are_scoped_to_their_teacher() {
  let s = store().await;
  let a = teacher(&s, "a@example.com").await;
  let b = teacher(&s, "b@example.com").await;

  let student = s
    .add_student(a.profile_id, NewStudent { name: " Sam ".into(), class_name: Some("".into()) })
    .await
    .unwrap();
  assert_eq!(student.name, "Sam");
  assert_eq!(student.class_name, None);

  assert!(s.get_student(a.profile_id, student.student_id).await.unwrap().is_some());
  assert!(s.get_student(b.profile_id, student.student_id).await.unwrap().is_none());
  assert!(s.list_students(b.profile_id).await.unwrap().is_empty());
  assert!(!s.delete_student(b.profile_id, student.student_id).await.unwrap());
}

#[tokio::test]
async fn deleting_a_student_keeps_their_essays() {
  let s = store().await;
  let t = teacher(&s, "a@example.com").await;
  let student = s
    .add_student(t.profile_id, NewStudent { name: "Sam".into(), class_name: None })
    .await
    .unwrap();

  let essay = s
    .add_essay(t.profile_id, NewEssay {
      student_id: Some(student.student_id),
      ..essay_input("Sleep")
    })
    .await
    .unwrap();

  assert!(s.delete_student(t.profile_id, student.student_id).await.unwrap());
  let essay = s.get_essay(t.profile_id, essay.essay_id).await.unwrap().unwrap();
  assert_eq!(essay.student_id, None);
}

// ─── Rubrics ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rubric_round_trips_criteria() {
  let s = store().await;
  let t = teacher(&s, "a@example.com").await;

  let rubric = s.add_rubric(t.profile_id, rubric_input()).await.unwrap();
  assert_eq!(rubric.version, 1);
  assert_eq!(rubric.total_points(), 30);

  let fetched = s.get_rubric(t.profile_id, rubric.rubric_id).await.unwrap().unwrap();
  assert_eq!(fetched.criteria, rubric.criteria);
  assert_eq!(fetched.grading_scale, GradingScale::GcseBand);
  assert_eq!(fetched.exam_board.as_deref(), Some("AQA"));
}

#[tokio::test]
async fn invalid_rubric_is_rejected() {
  let s = store().await;
  let t = teacher(&s, "a@example.com").await;
  let result = s
    .add_rubric(t.profile_id, NewRubric { criteria: vec![], ..rubric_input() })
    .await;
  assert!(matches!(result, Err(Error::Core(_))));
}

#[tokio::test]
async fn clone_increments_version_and_records_lineage() {
  let s = store().await;
  let t = teacher(&s, "a@example.com").await;
  let v1 = s.add_rubric(t.profile_id, rubric_input()).await.unwrap();

  let v2 = s
    .clone_rubric(t.profile_id, v1.rubric_id, RubricClone::default())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(v2.version, 2);
  assert_eq!(v2.parent_id, Some(v1.rubric_id));
  assert_eq!(v2.name, v1.name);
  assert_ne!(v2.rubric_id, v1.rubric_id);

  let v3 = s
    .clone_rubric(t.profile_id, v2.rubric_id, RubricClone { name: Some("Argument v3".into()) })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(v3.version, 3);
  assert_eq!(v3.name, "Argument v3");

  assert_eq!(s.list_rubrics(t.profile_id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn clone_of_other_teachers_rubric_is_none() {
  let s = store().await;
  let a = teacher(&s, "a@example.com").await;
  let b = teacher(&s, "b@example.com").await;
  let rubric = s.add_rubric(a.profile_id, rubric_input()).await.unwrap();

  let cloned = s
    .clone_rubric(b.profile_id, rubric.rubric_id, RubricClone::default())
    .await
    .unwrap();
  assert!(cloned.is_none());
}

// ─── Essays ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn essay_gets_word_count_and_pending_status() {
  let s = store().await;
  let t = teacher(&s, "a@example.com").await;

  let essay = s.add_essay(t.profile_id, essay_input("  ")).await.unwrap();
  assert_eq!(essay.word_count, 8);
  assert_eq!(essay.status, EssayStatus::Pending);
  assert_eq!(essay.title, "Untitled essay");
}

#[tokio::test]
async fn essay_cannot_reference_foreign_rubric() {
  let s = store().await;
  let a = teacher(&s, "a@example.com").await;
  let b = teacher(&s, "b@example.com").await;
  let rubric = s.add_rubric(a.profile_id, rubric_input()).await.unwrap();

  let result = s
    .add_essay(b.profile_id, NewEssay {
      rubric_id: Some(rubric.rubric_id),
      ..essay_input("Sleep")
    })
    .await;
  assert!(matches!(result, Err(Error::Core(CoreError::RubricNotFound(_)))));
}

#[tokio::test]
async fn list_essays_filters_by_status_and_rubric() {
  let s = store().await;
  let t = teacher(&s, "a@example.com").await;
  let rubric = s.add_rubric(t.profile_id, rubric_input()).await.unwrap();

  let first = s
    .add_essay(t.profile_id, NewEssay {
      rubric_id: Some(rubric.rubric_id),
      ..essay_input("First")
    })
    .await
    .unwrap();
  s.add_essay(t.profile_id, essay_input("Second")).await.unwrap();

  assert!(
    s.set_essay_status(t.profile_id, first.essay_id, EssayStatus::Graded)
      .await
      .unwrap()
  );

  let all = s.list_essays(t.profile_id, &EssayQuery::default()).await.unwrap();
  assert_eq!(all.len(), 2);
  assert_eq!(all[0].title, "Second", "newest first");

  let graded = s
    .list_essays(t.profile_id, &EssayQuery {
      status: Some(EssayStatus::Graded),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(graded.len(), 1);
  assert_eq!(graded[0].essay_id, first.essay_id);

  let by_rubric = s
    .list_essays(t.profile_id, &EssayQuery {
      rubric_id: Some(rubric.rubric_id),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(by_rubric.len(), 1);
}

#[tokio::test]
async fn deleting_rubric_clears_essay_reference() {
  let s = store().await;
  let t = teacher(&s, "a@example.com").await;
  let rubric = s.add_rubric(t.profile_id, rubric_input()).await.unwrap();
  let essay = s
    .add_essay(t.profile_id, NewEssay {
      rubric_id: Some(rubric.rubric_id),
      ..essay_input("Sleep")
    })
    .await
    .unwrap();

  assert!(s.delete_rubric(t.profile_id, rubric.rubric_id).await.unwrap());
  let essay = s.get_essay(t.profile_id, essay.essay_id).await.unwrap().unwrap();
  assert_eq!(essay.rubric_id, None);
}

// ─── Feedback ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn save_feedback_round_trips() {
  let s = store().await;
  let t = teacher(&s, "a@example.com").await;
  let essay = s.add_essay(t.profile_id, essay_input("Sleep")).await.unwrap();

  let saved = s.save_feedback(t.profile_id, essay.essay_id, draft("Solid")).await.unwrap();
  let fetched = s.get_feedback(t.profile_id, essay.essay_id).await.unwrap().unwrap();

  assert_eq!(fetched.feedback_id, saved.feedback_id);
  assert_eq!(fetched.draft.summary, "Solid");
  assert_eq!(fetched.draft.strengths, vec!["Clear thesis"]);
  assert_eq!(fetched.draft.score, Score::clamped(21.0, 30.0));
  assert_eq!(fetched.draft.band, Some(4));
  assert_eq!(fetched.draft.criterion_scores.len(), 1);
}

#[tokio::test]
async fn regrading_replaces_feedback() {
  let s = store().await;
  let t = teacher(&s, "a@example.com").await;
  let essay = s.add_essay(t.profile_id, essay_input("Sleep")).await.unwrap();

  s.save_feedback(t.profile_id, essay.essay_id, draft("First pass")).await.unwrap();
  let second = s.save_feedback(t.profile_id, essay.essay_id, draft("Second pass")).await.unwrap();

  let fetched = s.get_feedback(t.profile_id, essay.essay_id).await.unwrap().unwrap();
  assert_eq!(fetched.feedback_id, second.feedback_id);
  assert_eq!(fetched.draft.summary, "Second pass");
}

#[tokio::test]
async fn feedback_is_scoped_and_deleted_with_essay() {
  let s = store().await;
  let a = teacher(&s, "a@example.com").await;
  let b = teacher(&s, "b@example.com").await;
  let essay = s.add_essay(a.profile_id, essay_input("Sleep")).await.unwrap();

  let foreign = s.save_feedback(b.profile_id, essay.essay_id, draft("x")).await;
  assert!(matches!(foreign, Err(Error::Core(CoreError::EssayNotFound(_)))));

  s.save_feedback(a.profile_id, essay.essay_id, draft("x")).await.unwrap();
  assert!(s.get_feedback(b.profile_id, essay.essay_id).await.unwrap().is_none());

  assert!(s.delete_essay(a.profile_id, essay.essay_id).await.unwrap());
  assert!(s.get_feedback(a.profile_id, essay.essay_id).await.unwrap().is_none());
}
