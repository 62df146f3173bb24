//! OpenAI backend for Rubriq.
//!
//! - [`client`]: a thin Chat Completions client that keeps the API key on the
//!   server.
//! - [`prompt`]: system and user prompts for one grading.
//! - [`sections`] and [`score`]: turn free-form model prose into feedback
//!   buckets, criterion scores and a GCSE band.
//! - [`grader::OpenAiGrader`]: the [`rubriq_core::grade::Grader`]
//!   implementation tying these together.

pub mod client;
pub mod error;
pub mod grader;
pub mod prompt;
pub mod score;
pub mod sections;

pub use client::{ChatOptions, Message, OpenAiClient};
pub use error::{Error, Result};
pub use grader::{OpenAiConfig, OpenAiGrader};
