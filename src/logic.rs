//! Flows that tie the engine pieces to the in-memory store.
//!
//! This includes:
//!   - Seeding groups with generated content (generate → distribute → store)
//!   - Answer submission (score → cooldown → totals → level)
//!   - Collaborator verification of a disputed answer (accepted answers are kept)
//!   - Wordle start and guess

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::domain::{AnswerTask, Cefr, ContentKind, GenerationRequest, GroupId, Language};
use crate::error::{EngineError, Result};
use crate::generation::{distribute, partition_and_generate, TextGenerator};
use crate::level::LevelInfo;
use crate::scoring::{score_with_rng, ScoreResult, ScoreState};
use crate::seeds::SeedPlan;
use crate::state::AppState;
use crate::verify::verify_answer;
use crate::wordle::{choose_target_word, fallback_word, Attempt, WordleState, WORD_LEN};

/// Generate `request` and spread the yield over `group_ids`. Returns items stored.
#[instrument(
  level = "info",
  skip(state, generator, config, request, group_ids, shutdown),
  fields(kind = ?request.content_kind, total = request.total_count, groups = group_ids.len())
)]
pub async fn generate_into_groups(
  state: &AppState,
  generator: Arc<dyn TextGenerator>,
  config: &EngineConfig,
  request: &GenerationRequest,
  group_ids: &[GroupId],
  shutdown: Option<watch::Receiver<bool>>,
) -> Result<usize> {
  if group_ids.is_empty() {
    return Err(EngineError::invalid("at least one destination group is required"));
  }
  let items = partition_and_generate(generator, request, config, shutdown).await?;

  let mut stored = 0;
  for assignment in distribute(items, group_ids) {
    stored += state.store_assignment(assignment).await?;
  }
  Ok(stored)
}

#[derive(Clone, Debug, Serialize)]
pub struct KindSeedSummary {
  pub kind: ContentKind,
  pub groups_created: usize,
  pub items_stored: usize,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

/// Create the plan's groups per content kind and fill them with generated items.
///
/// A failing kind is logged and reported in its summary; the others still run.
#[instrument(level = "info", skip(state, generator, config, shutdown), fields(kinds = plan.kinds.len(), level = %plan.level))]
pub async fn seed_content(
  state: &AppState,
  generator: Arc<dyn TextGenerator>,
  config: &EngineConfig,
  plan: &SeedPlan,
  shutdown: Option<watch::Receiver<bool>>,
) -> Vec<KindSeedSummary> {
  let mut out = Vec::with_capacity(plan.kinds.len());

  for &kind in &plan.kinds {
    let mut group_ids = Vec::new();
    for name in plan.group_names(kind) {
      group_ids.push(state.create_group(&name, kind, plan.level, plan.language).await);
    }

    let request = GenerationRequest::new(kind, plan.level, plan.total_per_kind(), plan.language)
      .and_then(|r| r.with_batch_size(config.batch_size));
    let outcome = match request {
      Ok(req) => {
        generate_into_groups(state, generator.clone(), config, &req, &group_ids, shutdown.clone()).await
      }
      Err(e) => Err(e),
    };

    let summary = match outcome {
      Ok(items_stored) => {
        info!(target: "drill_engine", ?kind, groups = group_ids.len(), items_stored, "Seeded content kind");
        KindSeedSummary { kind, groups_created: group_ids.len(), items_stored, error: None }
      }
      Err(e) => {
        error!(target: "drill_engine", ?kind, error = %e, "Seeding failed for content kind");
        KindSeedSummary { kind, groups_created: group_ids.len(), items_stored: 0, error: Some(e.to_string()) }
      }
    };
    out.push(summary);

    if shutdown.as_ref().is_some_and(|rx| *rx.borrow()) {
      warn!(target: "drill_engine", "Shutdown requested; skipping remaining content kinds");
      break;
    }
  }
  out
}

/// One answer as reported by the caller.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct AnswerInput {
  pub is_correct: bool,
  #[serde(default)] pub is_known: bool,
  #[serde(default)] pub proficiency_level: Option<Cefr>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AnswerOutcome {
  pub result: ScoreResult,
  pub totals: ScoreState,
  pub level: LevelInfo,
}

#[instrument(level = "info", skip(state, rng), fields(%user_id, correct = input.is_correct))]
pub async fn submit_answer<R: Rng>(
  state: &AppState,
  user_id: &str,
  input: AnswerInput,
  rng: &mut R,
) -> Result<AnswerOutcome> {
  if user_id.trim().is_empty() {
    return Err(EngineError::invalid("user_id is empty"));
  }
  let (result, totals) = state
    .apply_score(user_id, |s| {
      score_with_rng(&s.event(input.is_correct, input.is_known, input.proficiency_level), rng)
    })
    .await;
  let level = state.levels.level(totals.total_points);

  info!(
    target: "scoring",
    %user_id,
    delta = result.points_delta,
    streak = result.new_streak,
    total = totals.total_points,
    mini_game = result.mini_game_triggered,
    "Answer scored"
  );
  Ok(AnswerOutcome { result, totals, level })
}

#[derive(Clone, Debug, Serialize)]
pub struct VerifyOutcome {
  pub is_correct: bool,
  pub explanation: String,
  /// The answer was new and is now accepted for this item.
  pub answer_added: bool,
}

/// Let the collaborator judge `given` for a stored item; a correct answer is
/// recorded as an alternative so the next exact check accepts it.
#[instrument(level = "info", skip(state, generator, config, given), fields(%group_id, item_index, ?task))]
pub async fn verify_and_record(
  state: &AppState,
  generator: &dyn TextGenerator,
  config: &EngineConfig,
  group_id: &GroupId,
  item_index: usize,
  task: AnswerTask,
  given: &str,
) -> Result<VerifyOutcome> {
  let (item, language) = state.get_item(group_id, item_index).await?;
  let (question, expected) = item
    .question_and_answer(task)
    .ok_or_else(|| EngineError::invalid(format!("{task:?} does not apply to {:?} items", item.kind())))?;

  let verdict = verify_answer(generator, &config.prompts, task, language, question, expected, given).await?;
  let answer_added = if verdict.is_correct {
    state.add_alternative_answer(group_id, item_index, task, given).await?
  } else {
    false
  };
  Ok(VerifyOutcome { is_correct: verdict.is_correct, explanation: verdict.explanation, answer_added })
}

#[derive(Clone, Debug, Serialize)]
pub struct WordleStart {
  pub session_id: Uuid,
  pub word_length: usize,
  pub max_attempts: usize,
}

/// Pick a target (collaborator first, built-in list otherwise) and open a session.
#[instrument(level = "info", skip(state, generator, config, rng), fields(%user_id))]
pub async fn start_wordle<R: Rng>(
  state: &AppState,
  generator: Option<&dyn TextGenerator>,
  config: &EngineConfig,
  user_id: &str,
  language: Language,
  level: Cefr,
  rng: &mut R,
) -> Result<WordleStart> {
  if user_id.trim().is_empty() {
    return Err(EngineError::invalid("user_id is empty"));
  }
  let target = match generator {
    Some(g) => choose_target_word(g, &config.prompts, language, level, rng).await,
    None => fallback_word(language, rng),
  };
  let game = WordleState::new(&target, config.wordle_max_attempts)?;
  let session_id = state.insert_wordle(user_id, game).await;
  Ok(WordleStart { session_id, word_length: WORD_LEN, max_attempts: config.wordle_max_attempts })
}

#[derive(Clone, Debug, Serialize)]
pub struct GuessOutcome {
  pub attempt: Attempt,
  pub solved: bool,
  pub game_over: bool,
  pub remaining_attempts: usize,
  /// Only set once the game is over.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub target_word: Option<String>,
}

#[instrument(level = "info", skip(state, guess), fields(%session_id, %user_id))]
pub async fn wordle_guess(state: &AppState, session_id: &Uuid, user_id: &str, guess: &str) -> Result<GuessOutcome> {
  state
    .with_wordle(session_id, user_id, |game| {
      let attempt = game.guess(guess)?.clone();
      Ok(GuessOutcome {
        attempt,
        solved: game.is_solved(),
        game_over: game.is_over(),
        remaining_attempts: game.remaining_attempts(),
        target_word: game.revealed_target().map(str::to_string),
      })
    })
    .await
}
