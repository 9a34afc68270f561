//! Batch fan-out generation pipeline.
//!
//! request → `partition` (bounded batches + prompts) → `dispatch` (concurrent
//! collaborator calls) → `normalize` (canonical items) → `distribute` (groups).
//! Collaborator failures only shrink the yield; the pipeline itself fails
//! only on invalid input.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::config::EngineConfig;
use crate::domain::{CanonicalItem, GenerationRequest};
use crate::error::{GenerationError, Result};

pub mod dispatch;
pub mod distribute;
pub mod normalize;
pub mod partition;
pub mod prompts;

pub use dispatch::{BatchOutcome, RawBatchResult};
pub use distribute::distribute;
pub use partition::Batch;

/// The external text-generation collaborator: prompt in, raw text out.
///
/// Constructed once at startup and shared (`Arc`) by every request.
#[async_trait]
pub trait TextGenerator: Send + Sync {
  async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError>;
}

/// Generate up to `request.total_count` canonical items.
///
/// Returns fewer items (possibly none) when batches fail or return unusable
/// output. `shutdown` cancels batches still in flight.
#[instrument(
  level = "info",
  target = "generation",
  skip(generator, config, shutdown),
  fields(kind = ?request.content_kind, level = %request.proficiency_level, total = request.total_count, batch_size = request.batch_size)
)]
pub async fn partition_and_generate(
  generator: Arc<dyn TextGenerator>,
  request: &GenerationRequest,
  config: &EngineConfig,
  shutdown: Option<watch::Receiver<bool>>,
) -> Result<Vec<CanonicalItem>> {
  request.validate(config.max_total_count)?;
  let batches = partition::plan_batches(request, &config.prompts)?;
  let num_batches = batches.len();
  let started = Instant::now();

  let results = dispatch::dispatch(generator, batches, config.batch_timeout(), shutdown).await;
  let succeeded = results.iter().filter(|r| r.is_success()).count();

  let items = normalize::normalize_results(
    &results,
    request.content_kind,
    request.language,
    request.category.as_deref(),
  );

  if succeeded == 0 {
    warn!(target: "generation", batches = num_batches, "Every batch failed; returning no items");
  }
  info!(
    target: "generation",
    requested = request.total_count,
    batches = num_batches,
    succeeded,
    failed = num_batches - succeeded,
    yielded = items.len(),
    elapsed = ?started.elapsed(),
    "Generation finished"
  );
  Ok(items)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Cefr, ContentKind, Language};
  use crate::error::EngineError;
  use std::sync::atomic::{AtomicUsize, Ordering};

  /// Replies with `count` translate pairs parsed from the prompt's leading number,
  /// failing every `fail_every`-th call.
  struct Echo {
    calls: AtomicUsize,
    fail_every: usize,
  }

  #[async_trait]
  impl TextGenerator for Echo {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
      let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
      if self.fail_every > 0 && n % self.fail_every == 0 {
        return Err(GenerationError::Transport("connection reset".into()));
      }
      let count: usize = prompt
        .split_whitespace()
        .find_map(|w| w.parse().ok())
        .unwrap_or(0);
      let items: Vec<String> = (0..count)
        .map(|i| format!("{{\"text_pl\": \"pl {i}\", \"text_fr\": \"fr {i}\"}}"))
        .collect();
      Ok(format!("```json\n[{}]\n```", items.join(",")))
    }
  }

  fn request(total: usize) -> GenerationRequest {
    GenerationRequest::new(ContentKind::TranslatePair, Cefr::B1, total, Language::Fr).unwrap()
  }

  #[tokio::test]
  async fn full_yield_when_every_batch_succeeds() {
    let generator: Arc<dyn TextGenerator> = Arc::new(Echo { calls: AtomicUsize::new(0), fail_every: 0 });
    let items = partition_and_generate(generator, &request(25), &EngineConfig::default(), None).await.unwrap();
    assert_eq!(items.len(), 25);
  }

  #[tokio::test]
  async fn failed_batches_shrink_yield_without_error() {
    let generator: Arc<dyn TextGenerator> = Arc::new(Echo { calls: AtomicUsize::new(0), fail_every: 2 });
    // 40 items → 4 batches of 10; calls 2 and 4 fail, whichever batches they are.
    let items = partition_and_generate(generator, &request(40), &EngineConfig::default(), None).await.unwrap();
    assert_eq!(items.len(), 20);
  }

  #[tokio::test]
  async fn all_batches_failing_is_an_empty_result() {
    let generator: Arc<dyn TextGenerator> = Arc::new(Echo { calls: AtomicUsize::new(0), fail_every: 1 });
    let items = partition_and_generate(generator, &request(30), &EngineConfig::default(), None).await.unwrap();
    assert!(items.is_empty());
  }

  #[tokio::test]
  async fn over_limit_request_is_invalid_input() {
    let generator: Arc<dyn TextGenerator> = Arc::new(Echo { calls: AtomicUsize::new(0), fail_every: 0 });
    let mut req = request(10);
    req.total_count = 80;
    let err = partition_and_generate(generator, &req, &EngineConfig::default(), None).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
  }
}
