//! Spreading generated items over destination groups.
//!
//! Contiguous slices keep each group topically coherent (batches tend to stay
//! on one theme): groups `0..G-1` get `floor(M / G)` items each, the last group
//! gets everything that is left.

use tracing::warn;

use crate::domain::{CanonicalItem, GroupAssignment, GroupId};

pub fn distribute(items: Vec<CanonicalItem>, group_ids: &[GroupId]) -> Vec<GroupAssignment> {
  let groups = group_ids.len();
  if groups == 0 {
    if !items.is_empty() {
      warn!(target: "generation", items = items.len(), "No destination groups; nothing distributed");
    }
    return Vec::new();
  }

  let per_group = items.len() / groups;
  let mut rest = items.into_iter();
  group_ids
    .iter()
    .enumerate()
    .map(|(i, &group_id)| {
      let take = if i + 1 < groups { per_group } else { usize::MAX };
      GroupAssignment { group_id, items: rest.by_ref().take(take).collect() }
    })
    .collect()
}
