//! Splitting a generation request into bounded batches.

use crate::config::Prompts;
use crate::domain::GenerationRequest;
use crate::error::{EngineError, Result};
use crate::generation::prompts::build_prompt;

/// One unit of work sent to the generation collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Batch {
  pub index: usize,
  pub item_count: usize,
  pub prompt: String,
}

/// Per-batch item counts for `total_count` items with at most `batch_size` requested per call.
///
/// The batch count is `ceil(total / batch_size)`; every batch gets
/// `floor(total / batches)` items except the last, which absorbs the remainder.
pub fn batch_sizes(total_count: usize, batch_size: usize) -> Result<Vec<usize>> {
  if total_count == 0 {
    return Err(EngineError::invalid("total_count must be positive"));
  }
  if batch_size == 0 {
    return Err(EngineError::invalid("batch_size must be positive"));
  }
  if total_count <= batch_size {
    return Ok(vec![total_count]);
  }

  let num_batches = total_count.div_ceil(batch_size);
  let per_batch = total_count / num_batches;
  let last = total_count - per_batch * (num_batches - 1);

  let mut sizes = vec![per_batch; num_batches - 1];
  sizes.push(last);
  Ok(sizes)
}

/// Build the ordered batches (with prompts) for a request.
pub fn plan_batches(request: &GenerationRequest, prompts: &Prompts) -> Result<Vec<Batch>> {
  let sizes = batch_sizes(request.total_count, request.batch_size)?;
  Ok(
    sizes
      .into_iter()
      .enumerate()
      .map(|(index, item_count)| Batch {
        index,
        item_count,
        prompt: build_prompt(request, item_count, prompts),
      })
      .collect(),
  )
}
