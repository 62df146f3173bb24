//! Batch grading: several gradings run one at a time, with pause/resume.
//!
//! A [`Batch`] owns an ordered list of essay ids and a cursor. [`Batch::run`]
//! walks the list in index order, invoking a caller-supplied step for each
//! essay. The pause flag is checked between items, never during one: pausing
//! lets the item in flight finish, then `run` returns with the batch
//! `paused`. After [`Batch::resume`], calling `run` again continues from the
//! next pending item.

use std::{
  collections::HashSet,
  fmt::Display,
  future::Future,
  sync::{
    Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
  },
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Public types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
  Running,
  Paused,
  Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
  Pending,
  Graded,
  Failed { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
  pub essay_id: Uuid,
  #[serde(flatten)]
  pub outcome:  ItemOutcome,
}

/// A point-in-time copy of a batch's progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSnapshot {
  pub batch_id:         Uuid,
  pub state:            BatchState,
  /// Set once a pause has been asked for but not yet observed by the loop.
  pub pause_requested:  bool,
  pub items:            Vec<BatchItem>,
  pub processed:        usize,
  pub total:            usize,
  pub progress_percent: u8,
  pub created_at:       DateTime<Utc>,
  pub completed_at:     Option<DateTime<Utc>>,
}

// ─── Batch ───────────────────────────────────────────────────────────────────

struct Progress {
  items:        Vec<BatchItem>,
  cursor:       usize,
  state:        BatchState,
  completed_at: Option<DateTime<Utc>>,
}

pub struct Batch {
  batch_id:        Uuid,
  teacher_id:      Uuid,
  created_at:      DateTime<Utc>,
  pause_requested: AtomicBool,
  running:         AtomicBool,
  progress:        Mutex<Progress>,
}

impl Batch {
  /// Build a batch over `essay_ids`. Duplicate ids are dropped, keeping the
  /// first occurrence. An empty batch starts out completed.
  pub fn new(teacher_id: Uuid, essay_ids: impl IntoIterator<Item = Uuid>) -> Self {
    let mut seen = HashSet::new();
    let items: Vec<BatchItem> = essay_ids
      .into_iter()
      .filter(|id| seen.insert(*id))
      .map(|essay_id| BatchItem { essay_id, outcome: ItemOutcome::Pending })
      .collect();

    let created_at = Utc::now();
    let (state, completed_at) = if items.is_empty() {
      (BatchState::Completed, Some(created_at))
    } else {
      (BatchState::Running, None)
    };

    Self {
      batch_id: Uuid::new_v4(),
      teacher_id,
      created_at,
      pause_requested: AtomicBool::new(false),
      running: AtomicBool::new(false),
      progress: Mutex::new(Progress { items, cursor: 0, state, completed_at }),
    }
  }

  pub fn batch_id(&self) -> Uuid { self.batch_id }

  pub fn teacher_id(&self) -> Uuid { self.teacher_id }

  /// When the last item finished, if it has.
  pub fn completed_at(&self) -> Option<DateTime<Utc>> { self.lock().completed_at }

  fn lock(&self) -> MutexGuard<'_, Progress> {
    self.progress.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Process pending items in order until the batch completes or a pause is
  /// observed. A failing step marks its item failed and the loop moves on.
  ///
  /// Only one `run` may be active at a time.
  pub async fn run<F, Fut, E>(&self, mut step: F) -> Result<BatchSnapshot>
  where
    F: FnMut(Uuid) -> Fut + Send,
    Fut: Future<Output = Result<(), E>> + Send,
    E: Display,
  {
    if self.running.swap(true, Ordering::AcqRel) {
      return Err(Error::BatchAlreadyRunning(self.batch_id));
    }
    let mut running = RunningGuard(Some(&self.running));

    loop {
      let (index, essay_id) = {
        let mut p = self.lock();
        let cursor = p.cursor;
        // The flag is released under the lock so a `resume` that sees the
        // new state can start the next run straight away.
        let Some(essay_id) = p.items.get(cursor).map(|i| i.essay_id) else {
          p.state = BatchState::Completed;
          p.completed_at = Some(Utc::now());
          running.release();
          break;
        };
        if self.pause_requested.load(Ordering::Acquire) {
          p.state = BatchState::Paused;
          running.release();
          break;
        }
        p.state = BatchState::Running;
        (cursor, essay_id)
      };

      let outcome = match step(essay_id).await {
        Ok(()) => ItemOutcome::Graded,
        Err(e) => {
          tracing::warn!(
            batch_id = %self.batch_id,
            essay_id = %essay_id,
            error = %e,
            "batch item failed"
          );
          ItemOutcome::Failed { error: e.to_string() }
        }
      };

      let mut p = self.lock();
      p.items[index].outcome = outcome;
      p.cursor = index + 1;
      tracing::debug!(
        batch_id = %self.batch_id,
        processed = p.cursor,
        total = p.items.len(),
        "batch item processed"
      );
    }

    let snapshot = self.snapshot();
    tracing::info!(
      batch_id = %self.batch_id,
      state = ?snapshot.state,
      progress = snapshot.progress_percent,
      "batch run stopped"
    );
    Ok(snapshot)
  }

  /// Ask the loop to stop before the next item.
  pub fn pause(&self) -> Result<()> {
    let p = self.lock();
    if p.state == BatchState::Completed {
      return Err(Error::BatchCompleted(self.batch_id));
    }
    self.pause_requested.store(true, Ordering::Release);
    Ok(())
  }

  /// Clear the pause flag.
  ///
  /// Returns `true` when the batch was paused and the caller must invoke
  /// [`Batch::run`] again, `false` when a pending pause was cancelled before
  /// the loop observed it.
  pub fn resume(&self) -> Result<bool> {
    let mut p = self.lock();
    match p.state {
      BatchState::Paused => {
        self.pause_requested.store(false, Ordering::Release);
        p.state = BatchState::Running;
        Ok(true)
      }
      BatchState::Running if self.pause_requested.load(Ordering::Acquire) => {
        self.pause_requested.store(false, Ordering::Release);
        Ok(false)
      }
      BatchState::Running | BatchState::Completed => {
        Err(Error::BatchNotPaused(self.batch_id))
      }
    }
  }

  pub fn snapshot(&self) -> BatchSnapshot {
    let p = self.lock();
    let total = p.items.len();
    let processed = p.cursor;
    let progress_percent = if total == 0 {
      100
    } else {
      u8::try_from(processed * 100 / total).unwrap_or(100)
    };
    BatchSnapshot {
      batch_id: self.batch_id,
      state: p.state,
      pause_requested: self.pause_requested.load(Ordering::Acquire),
      items: p.items.clone(),
      processed,
      total,
      progress_percent,
      created_at: self.created_at,
      completed_at: p.completed_at,
    }
  }
}

/// Clears the running flag when `run` stops or its future is dropped.
struct RunningGuard<'a>(Option<&'a AtomicBool>);

impl RunningGuard<'_> {
  fn release(&mut self) {
    if let Some(flag) = self.0.take() {
      flag.store(false, Ordering::Release);
    }
  }
}

impl Drop for RunningGuard<'_> {
  fn drop(&mut self) { self.release(); }
}

#[cfg(test)]
mod tests {
  use std::{
    convert::Infallible,
    sync::{Arc, Mutex},
  };

  use super::*;

  fn ids(n: usize) -> Vec<Uuid> { (0..n).map(|_| Uuid::new_v4()).collect() }

  #[tokio::test]
  async fn processes_items_in_index_order() {
    let essays = ids(4);
    let batch = Batch::new(Uuid::new_v4(), essays.clone());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let log = seen.clone();
    let snapshot = batch
      .run(move |id| {
        log.lock().unwrap().push(id);
        async { Ok::<(), Infallible>(()) }
      })
      .await
      .unwrap();

    assert_eq!(*seen.lock().unwrap(), essays);
    assert_eq!(snapshot.state, BatchState::Completed);
    assert_eq!(snapshot.progress_percent, 100);
    assert!(snapshot.items.iter().all(|i| i.outcome == ItemOutcome::Graded));
  }

  #[tokio::test]
  async fn failures_are_recorded_and_do_not_stop_the_batch() {
    let essays = ids(3);
    let bad = essays[1];
    let batch = Batch::new(Uuid::new_v4(), essays);

    let snapshot = batch
      .run(move |id| async move {
        if id == bad { Err("model unavailable") } else { Ok(()) }
      })
      .await
      .unwrap();

    assert_eq!(snapshot.state, BatchState::Completed);
    assert_eq!(snapshot.items[0].outcome, ItemOutcome::Graded);
    assert_eq!(
      snapshot.items[1].outcome,
      ItemOutcome::Failed { error: "model unavailable".into() }
    );
    assert_eq!(snapshot.items[2].outcome, ItemOutcome::Graded);
  }

  #[tokio::test]
  async fn pause_halts_after_current_item_and_resume_continues() {
    let essays = ids(4);
    let batch = Arc::new(Batch::new(Uuid::new_v4(), essays.clone()));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let (handle, log, pause_on) = (batch.clone(), seen.clone(), essays[1]);
    let snapshot = batch
      .run(move |id| {
        log.lock().unwrap().push(id);
        if id == pause_on {
          handle.pause().unwrap();
        }
        async { Ok::<(), Infallible>(()) }
      })
      .await
      .unwrap();

    assert_eq!(snapshot.state, BatchState::Paused);
    assert_eq!(snapshot.processed, 2);
    assert_eq!(snapshot.progress_percent, 50);
    assert_eq!(snapshot.items[2].outcome, ItemOutcome::Pending);
    assert_eq!(seen.lock().unwrap().len(), 2);
    assert_eq!(snapshot.completed_at, None);

    assert!(batch.resume().unwrap());
    let log = seen.clone();
    let snapshot = batch
      .run(move |id| {
        log.lock().unwrap().push(id);
        async { Ok::<(), Infallible>(()) }
      })
      .await
      .unwrap();

    assert_eq!(snapshot.state, BatchState::Completed);
    assert_eq!(*seen.lock().unwrap(), essays);
    assert!(snapshot.completed_at.is_some_and(|t| t >= snapshot.created_at));
    assert_eq!(batch.completed_at(), snapshot.completed_at);
  }

  #[tokio::test]
  async fn pause_before_run_processes_nothing() {
    let batch = Batch::new(Uuid::new_v4(), ids(2));
    batch.pause().unwrap();

    let snapshot = batch
      .run(|_| async { Ok::<(), Infallible>(()) })
      .await
      .unwrap();

    assert_eq!(snapshot.state, BatchState::Paused);
    assert_eq!(snapshot.processed, 0);
  }

  #[tokio::test]
  async fn resume_requires_a_pause() {
    let batch = Batch::new(Uuid::new_v4(), ids(1));
    assert!(matches!(batch.resume(), Err(Error::BatchNotPaused(_))));

    batch.pause().unwrap();
    // The loop has not observed the pause yet, so resuming just cancels it.
    assert!(!batch.resume().unwrap());
    assert!(!batch.snapshot().pause_requested);
  }

  #[tokio::test]
  async fn completed_batches_cannot_be_paused() {
    let batch = Batch::new(Uuid::new_v4(), ids(1));
    batch.run(|_| async { Ok::<(), Infallible>(()) }).await.unwrap();
    assert!(matches!(batch.pause(), Err(Error::BatchCompleted(_))));
  }

  #[test]
  fn duplicates_are_dropped_and_empty_batches_are_complete() {
    let id = Uuid::new_v4();
    let batch = Batch::new(Uuid::new_v4(), [id, id, Uuid::new_v4()]);
    assert_eq!(batch.snapshot().total, 2);
    assert_eq!(batch.snapshot().items[0].essay_id, id);

    let empty = Batch::new(Uuid::new_v4(), []);
    let snap = empty.snapshot();
    assert_eq!(snap.state, BatchState::Completed);
    assert_eq!(snap.progress_percent, 100);
    assert_eq!(snap.completed_at, Some(snap.created_at));
  }
}
