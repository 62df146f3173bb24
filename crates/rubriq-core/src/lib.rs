//! Core types and trait definitions for Rubriq.
//!
//! Domain types (profiles, students, rubrics, essays, feedback), the
//! [`store::GradingStore`] and [`grade::Grader`] seams, and the batch runner.
//! No HTTP or database dependencies.

#![allow(async_fn_in_trait)]

pub mod batch;
pub mod error;
pub mod essay;
pub mod feedback;
pub mod grade;
pub mod profile;
pub mod rubric;
pub mod store;
pub mod student;

pub use error::{Error, Result};
