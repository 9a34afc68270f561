//! Error taxonomy for the engine.
//!
//! - `InvalidInput`: caller mistakes, surfaced immediately and never retried.
//! - `Generation`: the text-generation collaborator failed. Inside the fan-out
//!   pipeline these are converted into per-batch failures and never escape.
//! - `Config`: configuration could not be loaded.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("generation failed: {0}")]
  Generation(#[from] GenerationError),

  #[error("config error ({path}): {message}")]
  Config { path: String, message: String },
}

/// Failure of a single call to the text-generation collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
  #[error("HTTP {status}: {message}")]
  Http { status: u16, message: String },

  #[error("transport error: {0}")]
  Transport(String),

  #[error("timed out after {0:?}")]
  Timeout(Duration),

  #[error("model returned empty content")]
  EmptyContent,

  #[error("unparseable reply: {0}")]
  Malformed(String),

  #[error("cancelled")]
  Cancelled,

  #[error("task aborted: {0}")]
  Aborted(String),
}

impl From<reqwest::Error> for GenerationError {
  fn from(e: reqwest::Error) -> Self {
    GenerationError::Transport(e.to_string())
  }
}

impl EngineError {
  pub fn invalid(msg: impl Into<String>) -> Self {
    EngineError::InvalidInput(msg.into())
  }
}

pub type Result<T> = std::result::Result<T, EngineError>;
