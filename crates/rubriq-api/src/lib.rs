//! JSON REST API for Rubriq.
//!
//! Exposes an axum [`Router`] backed by any [`GradingStore`] and [`Grader`].
//! Every handler is scoped to the teacher in the request's [`TeacherId`]
//! extension; authentication that puts it there, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rubriq_api::api_router(store.clone(), grader.clone()))
//! .layer(middleware::from_fn_with_state(state, auth::require_teacher))
//! ```

pub mod analyze;
pub mod batches;
pub mod error;
pub mod essays;
pub mod grading;
pub mod profile;
pub mod rubrics;
pub mod students;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use rubriq_core::{grade::Grader, store::GradingStore};
use uuid::Uuid;

pub use batches::BatchRegistry;
pub use error::ApiError;

/// The authenticated teacher, inserted as a request extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TeacherId(pub Uuid);

/// Shared handler state.
pub struct ApiState<S, G> {
  pub store:   Arc<S>,
  pub grader:  Arc<G>,
  pub batches: Arc<BatchRegistry>,
}

impl<S, G> Clone for ApiState<S, G> {
  fn clone(&self) -> Self {
    Self {
      store:   self.store.clone(),
      grader:  self.grader.clone(),
      batches: self.batches.clone(),
    }
  }
}

/// Build a fully-materialised API router over `store` and `grader`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, G>(store: Arc<S>, grader: Arc<G>) -> Router<()>
where
  S: GradingStore + 'static,
  G: Grader + 'static,
{
  let state = ApiState {
    store,
    grader,
    batches: Arc::new(BatchRegistry::default()),
  };

  Router::new()
    .route("/profile", get(profile::handler::<S, G>))
    // Students
    .route("/students", get(students::list::<S, G>).post(students::create::<S, G>))
    .route(
      "/students/{id}",
      get(students::get_one::<S, G>).delete(students::delete_one::<S, G>),
    )
    // Rubrics
    .route("/rubrics", get(rubrics::list::<S, G>).post(rubrics::create::<S, G>))
    .route("/rubrics/import", post(rubrics::import::<S, G>))
    .route(
      "/rubrics/{id}",
      get(rubrics::get_one::<S, G>).delete(rubrics::delete_one::<S, G>),
    )
    .route("/rubrics/{id}/clone", post(rubrics::clone_one::<S, G>))
    // Essays
    .route("/essays", get(essays::list::<S, G>).post(essays::create::<S, G>))
    .route(
      "/essays/{id}",
      get(essays::get_one::<S, G>).delete(essays::delete_one::<S, G>),
    )
    .route("/essays/{id}/grade", post(essays::grade::<S, G>))
    .route("/essays/{id}/feedback", get(essays::feedback::<S, G>))
    // Grading
    .route("/analyze", post(analyze::handler::<S, G>))
    .route("/batches", post(batches::create::<S, G>))
    .route("/batches/{id}", get(batches::get_one::<S, G>))
    .route("/batches/{id}/pause", post(batches::pause::<S, G>))
    .route("/batches/{id}/resume", post(batches::resume::<S, G>))
    .with_state(state)
}
