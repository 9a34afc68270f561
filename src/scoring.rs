//! Adaptive scoring: one answer event + current streak → point delta, new
//! streak, multiplier tier and a random mini-game trigger.
//!
//! `score` is a pure transition; it never touches stored state. Callers apply
//! the result with `ScoreState::apply` and own any mini-game cooldown policy.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::Cefr;

/// Points for a correct answer on an already-mastered item.
pub const REVIEW_POINTS: u32 = 2;
/// Base points when the event carries no level.
pub const DEFAULT_BASE_POINTS: u32 = 10;
pub const PENALTY_NEW_ITEM: i64 = 4;
pub const PENALTY_KNOWN_ITEM: i64 = 10;
/// Chance that a correct answer offers a mini-game.
pub const MINI_GAME_PROBABILITY: f64 = 0.15;

/// Streak thresholds, highest first: (minimum streak, multiplier in tenths).
const MULTIPLIER_TIERS: [(u32, u32); 3] = [(10, 20), (5, 15), (2, 12)];

pub fn base_points(level: Option<Cefr>) -> u32 {
  match level {
    Some(Cefr::A1 | Cefr::A2) => 10,
    Some(Cefr::B1 | Cefr::B2) => 20,
    Some(Cefr::C1 | Cefr::C2) => 30,
    None => DEFAULT_BASE_POINTS,
  }
}

fn multiplier_tenths(streak: u32) -> u32 {
  MULTIPLIER_TIERS
    .iter()
    .find(|(min, _)| streak >= *min)
    .map(|(_, tenths)| *tenths)
    .unwrap_or(10)
}

pub fn multiplier_for_streak(streak: u32) -> f64 {
  f64::from(multiplier_tenths(streak)) / 10.0
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScoreEvent {
  pub is_correct: bool,
  /// Item was already mastered; a correct answer is only a review.
  pub is_known: bool,
  #[serde(default)] pub proficiency_level: Option<Cefr>,
  pub current_streak: u32,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq)]
pub struct ScoreResult {
  pub points_delta: i64,
  pub base_points: u32,
  pub new_streak: u32,
  pub multiplier: f64,
  pub mini_game_triggered: bool,
}

/// Score one answer using the thread-local RNG for the mini-game roll.
pub fn score(event: &ScoreEvent) -> ScoreResult {
  score_with_rng(event, &mut rand::thread_rng())
}

/// Score one answer with an injected RNG (deterministic in tests).
pub fn score_with_rng<R: Rng>(event: &ScoreEvent, rng: &mut R) -> ScoreResult {
  if !event.is_correct {
    let penalty = if event.is_known { PENALTY_KNOWN_ITEM } else { PENALTY_NEW_ITEM };
    return ScoreResult {
      points_delta: -penalty,
      base_points: 0,
      new_streak: 0,
      multiplier: 1.0,
      mini_game_triggered: false,
    };
  }

  let new_streak = event.current_streak.saturating_add(1);
  let tenths = multiplier_tenths(new_streak);
  let base = if event.is_known { REVIEW_POINTS } else { base_points(event.proficiency_level) };
  // Integer tenths keep the truncation exact: 2 × 1.2 is 2, never 3.
  let points_delta = i64::from(base * tenths / 10);
  let multiplier = f64::from(tenths) / 10.0;
  let mini_game_triggered = rng.gen_bool(MINI_GAME_PROBABILITY);

  ScoreResult { points_delta, base_points: base, new_streak, multiplier, mini_game_triggered }
}

/// Per-user scoring totals as stored by the persistence collaborator.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreState {
  pub total_points: u64,
  pub current_streak: u32,
  pub highest_combo: u32,
}

impl ScoreState {
  /// Apply a result: points floored at zero, streak replaced, best combo only rises.
  pub fn apply(&mut self, result: &ScoreResult) {
    self.total_points = self.total_points.saturating_add_signed(result.points_delta);
    self.current_streak = result.new_streak;
    self.highest_combo = self.highest_combo.max(result.new_streak);
  }

  pub fn event(&self, is_correct: bool, is_known: bool, level: Option<Cefr>) -> ScoreEvent {
    ScoreEvent { is_correct, is_known, proficiency_level: level, current_streak: self.current_streak }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn correct_new(level: Option<Cefr>, streak: u32) -> ScoreEvent {
    ScoreEvent { is_correct: true, is_known: false, proficiency_level: level, current_streak: streak }
  }

  #[test]
  fn five_correct_a1_answers_climb_the_tiers() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut state = ScoreState::default();
    let mut deltas = vec![];
    let mut streaks = vec![];
    let mut multipliers = vec![];
    for _ in 0..5 {
      let r = score_with_rng(&state.event(true, false, Some(Cefr::A1)), &mut rng);
      state.apply(&r);
      deltas.push(r.points_delta);
      streaks.push(r.new_streak);
      multipliers.push(r.multiplier);
    }
    assert_eq!(deltas, vec![10, 12, 12, 12, 15]);
    assert_eq!(streaks, vec![1, 2, 3, 4, 5]);
    assert_eq!(multipliers, vec![1.0, 1.2, 1.2, 1.2, 1.5]);
    assert_eq!(state.total_points, 61);
    assert_eq!(state.highest_combo, 5);
  }

  #[test]
  fn top_tier_doubles_and_truncates() {
    let mut rng = StdRng::seed_from_u64(1);
    assert_eq!(score_with_rng(&correct_new(Some(Cefr::C2), 9), &mut rng).points_delta, 60);
    // 2 * 1.2 = 2.4 → 2
    let review = ScoreEvent { is_known: true, ..correct_new(None, 1) };
    assert_eq!(score_with_rng(&review, &mut rng).points_delta, 2);
    // 20 * 1.5 = 30
    assert_eq!(score_with_rng(&correct_new(Some(Cefr::B2), 6), &mut rng).points_delta, 30);
  }

  #[test]
  fn unspecified_level_uses_default_base() {
    let mut rng = StdRng::seed_from_u64(3);
    let r = score_with_rng(&correct_new(None, 0), &mut rng);
    assert_eq!(r.base_points, DEFAULT_BASE_POINTS);
    assert_eq!(r.points_delta, 10);
  }

  #[test]
  fn wrong_answer_resets_streak_and_penalizes() {
    let mut rng = StdRng::seed_from_u64(5);
    for streak in [0, 3, 17] {
      let new_item = ScoreEvent { is_correct: false, is_known: false, proficiency_level: Some(Cefr::C1), current_streak: streak };
      let r = score_with_rng(&new_item, &mut rng);
      assert_eq!((r.points_delta, r.new_streak, r.multiplier, r.mini_game_triggered), (-4, 0, 1.0, false));

      let known = ScoreEvent { is_known: true, ..new_item };
      assert_eq!(score_with_rng(&known, &mut rng).points_delta, -10);
    }
  }

  #[test]
  fn applied_points_never_go_negative() {
    let mut state = ScoreState { total_points: 6, current_streak: 4, highest_combo: 9 };
    let r = score_with_rng(&state.event(false, true, None), &mut StdRng::seed_from_u64(0));
    state.apply(&r);
    assert_eq!(state, ScoreState { total_points: 0, current_streak: 0, highest_combo: 9 });
  }

  #[test]
  fn huge_totals_saturate_instead_of_wrapping() {
    let penalty = ScoreResult { points_delta: -10, base_points: 0, new_streak: 0, multiplier: 1.0, mini_game_triggered: false };
    let mut state = ScoreState { total_points: u64::MAX - 3, ..ScoreState::default() };
    state.apply(&penalty);
    assert_eq!(state.total_points, u64::MAX - 13);

    let bonus = ScoreResult { points_delta: 60, new_streak: 1, multiplier: 2.0, ..penalty };
    state.apply(&bonus);
    state.apply(&bonus);
    assert_eq!(state.total_points, u64::MAX);
  }

  #[test]
  fn mini_game_rate_is_roughly_fifteen_percent() {
    let mut rng = StdRng::seed_from_u64(42);
    let n = 20_000;
    let hits = (0..n)
      .filter(|_| score_with_rng(&correct_new(Some(Cefr::A2), 0), &mut rng).mini_game_triggered)
      .count();
    let rate = hits as f64 / n as f64;
    assert!((0.13..0.17).contains(&rate), "rate={rate}");
  }
}
