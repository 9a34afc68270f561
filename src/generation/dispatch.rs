//! Concurrent fan-out of batches to the generation collaborator.
//!
//! One task per batch on a `JoinSet`. Each task owns its batch and returns
//! `(slot, outcome)`; results are written into indexed slots so the caller sees
//! batch order regardless of completion order. A failing, timed-out or
//! cancelled batch becomes `BatchOutcome::Failure` and never aborts siblings.
//! Dropping the returned future aborts every outstanding task.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, instrument, warn};

use crate::error::GenerationError;
use crate::generation::partition::Batch;
use crate::generation::TextGenerator;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchOutcome {
  Success(String),
  Failure(GenerationError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawBatchResult {
  pub batch_index: usize,
  pub outcome: BatchOutcome,
}

impl RawBatchResult {
  pub fn is_success(&self) -> bool {
    matches!(self.outcome, BatchOutcome::Success(_))
  }
}

/// Run every batch concurrently and collect results in batch order.
///
/// `shutdown` is an optional request-wide cancellation signal: once it flips to
/// `true`, batches still in flight resolve to `Failure(Cancelled)`; finished
/// batches keep their results.
#[instrument(level = "info", target = "generation", skip_all, fields(batches = batches.len(), timeout = ?per_batch_timeout))]
pub async fn dispatch(
  generator: Arc<dyn TextGenerator>,
  batches: Vec<Batch>,
  per_batch_timeout: Duration,
  shutdown: Option<watch::Receiver<bool>>,
) -> Vec<RawBatchResult> {
  let indices: Vec<usize> = batches.iter().map(|b| b.index).collect();
  let mut tasks = JoinSet::new();

  for (slot, batch) in batches.into_iter().enumerate() {
    let generator = Arc::clone(&generator);
    let mut shutdown = shutdown.clone();
    tasks.spawn(async move {
      let started = Instant::now();
      let outcome = run_batch(generator.as_ref(), &batch.prompt, per_batch_timeout, shutdown.as_mut()).await;
      match &outcome {
        BatchOutcome::Success(text) => {
          debug!(target: "generation", batch = batch.index, items = batch.item_count, elapsed = ?started.elapsed(), response_len = text.len(), "Batch completed");
        }
        BatchOutcome::Failure(e) => {
          warn!(target: "generation", batch = batch.index, items = batch.item_count, elapsed = ?started.elapsed(), error = %e, "Batch failed; siblings continue");
        }
      }
      (slot, outcome)
    });
  }

  let mut slots: Vec<Option<BatchOutcome>> = vec![None; indices.len()];
  while let Some(joined) = tasks.join_next().await {
    match joined {
      Ok((slot, outcome)) => {
        if let Some(entry) = slots.get_mut(slot) {
          *entry = Some(outcome);
        }
      }
      Err(e) => {
        error!(target: "generation", error = %e, "Batch task did not finish");
      }
    }
  }

  slots
    .into_iter()
    .zip(indices)
    .map(|(outcome, batch_index)| RawBatchResult {
      batch_index,
      outcome: outcome.unwrap_or_else(|| {
        BatchOutcome::Failure(GenerationError::Aborted("task panicked or was aborted".into()))
      }),
    })
    .collect()
}

async fn run_batch(
  generator: &dyn TextGenerator,
  prompt: &str,
  per_batch_timeout: Duration,
  shutdown: Option<&mut watch::Receiver<bool>>,
) -> BatchOutcome {
  let call = tokio::time::timeout(per_batch_timeout, generator.generate(prompt));

  let res = match shutdown {
    Some(rx) => {
      tokio::select! {
        r = call => r,
        _ = cancelled(rx) => return BatchOutcome::Failure(GenerationError::Cancelled),
      }
    }
    None => call.await,
  };

  match res {
    Ok(Ok(text)) => BatchOutcome::Success(text),
    Ok(Err(e)) => BatchOutcome::Failure(e),
    Err(_) => BatchOutcome::Failure(GenerationError::Timeout(per_batch_timeout)),
  }
}

/// Resolves once the signal reads `true`. A dropped sender means nobody can cancel anymore.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
  let closed = rx.wait_for(|stop| *stop).await.is_err();
  if closed {
    std::future::pending::<()>().await;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;
  use std::collections::HashMap;

  /// Scripted collaborator: per-prompt delay and reply.
  struct Scripted {
    replies: HashMap<String, (u64, Result<String, GenerationError>)>,
  }

  #[async_trait]
  impl TextGenerator for Scripted {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
      let (delay_ms, reply) = self
        .replies
        .get(prompt)
        .cloned()
        .unwrap_or((0, Err(GenerationError::EmptyContent)));
      tokio::time::sleep(Duration::from_millis(delay_ms)).await;
      reply
    }
  }

  fn batch(index: usize, prompt: &str) -> Batch {
    Batch { index, item_count: 1, prompt: prompt.to_string() }
  }

  fn scripted(entries: &[(&str, u64, Result<String, GenerationError>)]) -> Arc<dyn TextGenerator> {
    Arc::new(Scripted {
      replies: entries
        .iter()
        .map(|(p, d, r)| (p.to_string(), (*d, r.clone())))
        .collect(),
    })
  }

  #[tokio::test]
  async fn results_keep_batch_order_despite_completion_order() {
    let generator = scripted(&[
      ("a", 60, Ok("A".into())),
      ("b", 1, Ok("B".into())),
      ("c", 30, Ok("C".into())),
    ]);
    let out = dispatch(generator, vec![batch(0, "a"), batch(1, "b"), batch(2, "c")], Duration::from_secs(5), None).await;
    let texts: Vec<_> = out
      .iter()
      .map(|r| match &r.outcome {
        BatchOutcome::Success(t) => t.clone(),
        BatchOutcome::Failure(e) => panic!("unexpected failure {e}"),
      })
      .collect();
    assert_eq!(texts, vec!["A", "B", "C"]);
    assert_eq!(out.iter().map(|r| r.batch_index).collect::<Vec<_>>(), vec![0, 1, 2]);
  }

  #[tokio::test]
  async fn failure_and_timeout_stay_local_to_their_batch() {
    let generator = scripted(&[
      ("ok", 0, Ok("fine".into())),
      ("boom", 0, Err(GenerationError::Http { status: 500, message: "down".into() })),
      ("slow", 2_000, Ok("late".into())),
    ]);
    let out = dispatch(
      generator,
      vec![batch(0, "ok"), batch(1, "boom"), batch(2, "slow")],
      Duration::from_millis(100),
      None,
    )
    .await;
    assert_eq!(out[0].outcome, BatchOutcome::Success("fine".into()));
    assert!(matches!(out[1].outcome, BatchOutcome::Failure(GenerationError::Http { status: 500, .. })));
    assert!(matches!(out[2].outcome, BatchOutcome::Failure(GenerationError::Timeout(_))));
  }

  #[tokio::test]
  async fn cancellation_keeps_finished_batches() {
    let generator = scripted(&[("fast", 0, Ok("done".into())), ("stuck", 10_000, Ok("never".into()))]);
    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(dispatch(
      generator,
      vec![batch(0, "fast"), batch(1, "stuck")],
      Duration::from_secs(30),
      Some(rx),
    ));
    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(true).unwrap();
    let out = handle.await.unwrap();
    assert_eq!(out[0].outcome, BatchOutcome::Success("done".into()));
    assert_eq!(out[1].outcome, BatchOutcome::Failure(GenerationError::Cancelled));
  }

  #[tokio::test]
  async fn dropped_shutdown_sender_does_not_cancel() {
    let generator = scripted(&[("a", 20, Ok("A".into()))]);
    let (tx, rx) = watch::channel(false);
    drop(tx);
    let out = dispatch(generator, vec![batch(0, "a")], Duration::from_secs(5), Some(rx)).await;
    assert!(out[0].is_success());
  }
}
