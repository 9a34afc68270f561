//! Point totals → named level plus progress toward the next one.

use serde::Serialize;

use crate::error::{EngineError, Result};

/// Default ladder: (minimum points, level name).
pub const DEFAULT_LEVELS: [(u64, &str); 10] = [
  (0, "Debiutant"),
  (100, "Nowicjusz"),
  (300, "Uczeń"),
  (600, "Adept"),
  (1000, "Początkujący"),
  (1500, "Średniozaawansowany"),
  (2500, "Zaawansowany"),
  (4000, "Ekspert"),
  (6000, "Mistrz"),
  (10000, "Legenda"),
];

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct LevelInfo {
  pub name: String,
  /// 0..=100 toward the next threshold; 100 at the top level.
  pub progress_percent: f64,
  pub next_threshold: Option<u64>,
}

/// Strictly increasing threshold table starting at zero.
#[derive(Clone, Debug)]
pub struct LevelCurve {
  levels: Vec<(u64, String)>,
}

impl Default for LevelCurve {
  fn default() -> Self {
    Self { levels: DEFAULT_LEVELS.iter().map(|(t, n)| (*t, n.to_string())).collect() }
  }
}

impl LevelCurve {
  pub fn new(levels: Vec<(u64, String)>) -> Result<Self> {
    match levels.first() {
      None => return Err(EngineError::invalid("level table is empty")),
      Some((first, _)) if *first != 0 => {
        return Err(EngineError::invalid("first level threshold must be 0"));
      }
      _ => {}
    }
    if levels.windows(2).any(|w| w[0].0 >= w[1].0) {
      return Err(EngineError::invalid("level thresholds must be strictly increasing"));
    }
    Ok(Self { levels })
  }

  pub fn level(&self, total_points: u64) -> LevelInfo {
    // First threshold is 0, so there is always at least one reached entry.
    let current = self.levels.partition_point(|(t, _)| *t <= total_points).max(1) - 1;
    let (lower, name) = &self.levels[current];
    let next = self.levels.get(current + 1).map(|(t, _)| *t);

    let progress_percent = match next {
      Some(upper) => {
        let pct = (total_points - lower) as f64 / (upper - lower) as f64 * 100.0;
        pct.min(100.0)
      }
      None => 100.0,
    };

    LevelInfo { name: name.clone(), progress_percent, next_threshold: next }
  }
}

/// Level on the default ladder.
pub fn level(total_points: u64) -> (String, f64) {
  let info = LevelCurve::default().level(total_points);
  (info.name, info.progress_percent)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn zero_points_is_first_level() {
    assert_eq!(level(0), ("Debiutant".to_string(), 0.0));
  }

  #[test]
  fn progress_within_band() {
    let info = LevelCurve::default().level(150);
    assert_eq!(info.name, "Nowicjusz");
    assert_eq!(info.progress_percent, 25.0);
    assert_eq!(info.next_threshold, Some(300));
  }

  #[test]
  fn exact_threshold_starts_new_level() {
    let info = LevelCurve::default().level(600);
    assert_eq!(info.name, "Adept");
    assert_eq!(info.progress_percent, 0.0);
  }

  #[test]
  fn top_level_is_full() {
    for pts in [10_000, 12_345, u64::MAX] {
      let info = LevelCurve::default().level(pts);
      assert_eq!(info.name, "Legenda");
      assert_eq!(info.progress_percent, 100.0);
      assert_eq!(info.next_threshold, None);
    }
  }

  #[test]
  fn malformed_tables_are_rejected() {
    assert!(LevelCurve::new(vec![]).is_err());
    assert!(LevelCurve::new(vec![(5, "a".into())]).is_err());
    assert!(LevelCurve::new(vec![(0, "a".into()), (10, "b".into()), (10, "c".into())]).is_err());
    assert!(LevelCurve::new(vec![(0, "only".into())]).is_ok());
  }

  #[test]
  fn progress_is_monotonic_within_each_band() {
    let curve = LevelCurve::default();
    let mut prev = curve.level(0);
    for pts in 1..=10_500u64 {
      let cur = curve.level(pts);
      if cur.name == prev.name {
        assert!(cur.progress_percent >= prev.progress_percent, "pts={pts}");
      }
      prev = cur;
    }
  }
}
