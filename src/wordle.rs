//! Five-letter word mini-game: duplicate-aware guess evaluation, the session
//! state machine, and picking a target word.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::config::Prompts;
use crate::domain::{Cefr, Language};
use crate::error::{EngineError, Result};
use crate::generation::TextGenerator;
use crate::seeds::wordle_fallback_words;
use crate::util::fill_template;

pub const WORD_LEN: usize = 5;
pub const DEFAULT_MAX_ATTEMPTS: usize = 6;

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LetterStatus {
  /// Right letter, right position.
  Exact,
  /// Letter occurs elsewhere in the target (and is not already accounted for).
  Present,
  Absent,
}

/// Uppercase letter by letter and check a five-letter word.
fn normalize_word(word: &str, what: &str) -> Result<[char; WORD_LEN]> {
  let chars: Vec<char> = word.trim().chars().map(fold_case).collect();
  if chars.len() != WORD_LEN {
    return Err(EngineError::invalid(format!(
      "{what} must have exactly {WORD_LEN} letters, got {}",
      chars.len()
    )));
  }
  if !chars.iter().all(|c| c.is_alphabetic()) {
    return Err(EngineError::invalid(format!("{what} must contain letters only")));
  }
  let mut out = [' '; WORD_LEN];
  out.copy_from_slice(&chars);
  Ok(out)
}

/// Simple case mapping: letters whose uppercase form is longer (ß → SS) are kept,
/// so a word never changes length.
fn fold_case(c: char) -> char {
  let mut upper = c.to_uppercase();
  match (upper.next(), upper.next()) {
    (Some(u), None) => u,
    _ => c,
  }
}

/// Score `guess` against `target`, case-insensitively.
///
/// Exact matches are taken first; the remaining target letters form a tally
/// that `Present` markings consume, so a letter is never marked more often
/// than it occurs in the target.
pub fn evaluate_guess(target: &str, guess: &str) -> Result<[LetterStatus; WORD_LEN]> {
  let target = normalize_word(target, "target")?;
  let guess = normalize_word(guess, "guess")?;

  let mut result = [LetterStatus::Absent; WORD_LEN];
  let mut remaining: HashMap<char, usize> = HashMap::new();

  for i in 0..WORD_LEN {
    if guess[i] == target[i] {
      result[i] = LetterStatus::Exact;
    } else {
      *remaining.entry(target[i]).or_insert(0) += 1;
    }
  }

  for i in 0..WORD_LEN {
    if result[i] == LetterStatus::Exact {
      continue;
    }
    if let Some(left) = remaining.get_mut(&guess[i]).filter(|n| **n > 0) {
      result[i] = LetterStatus::Present;
      *left -= 1;
    }
  }

  Ok(result)
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Attempt {
  pub guess: String,
  pub statuses: [LetterStatus; WORD_LEN],
}

/// One game: a hidden target and the guesses made so far.
#[derive(Clone, Debug)]
pub struct WordleState {
  target_word: String,
  attempts: Vec<Attempt>,
  max_attempts: usize,
  solved: bool,
}

impl WordleState {
  pub fn new(target_word: &str, max_attempts: usize) -> Result<Self> {
    if max_attempts == 0 {
      return Err(EngineError::invalid("max_attempts must be positive"));
    }
    let letters = normalize_word(target_word, "target")?;
    if !letters.iter().all(char::is_ascii_alphabetic) {
      return Err(EngineError::invalid("target must use unaccented letters A-Z"));
    }
    Ok(Self {
      target_word: letters.iter().collect(),
      attempts: Vec::new(),
      max_attempts,
      solved: false,
    })
  }

  /// Evaluate and record a guess. Errors once the game is over.
  pub fn guess(&mut self, guess: &str) -> Result<&Attempt> {
    if self.is_over() {
      return Err(EngineError::invalid("game is already finished"));
    }
    let letters = normalize_word(guess, "guess")?;
    let statuses = evaluate_guess(&self.target_word, guess)?;
    self.solved = statuses.iter().all(|s| *s == LetterStatus::Exact);
    self.attempts.push(Attempt { guess: letters.iter().collect(), statuses });
    Ok(&self.attempts[self.attempts.len() - 1])
  }

  pub fn is_solved(&self) -> bool { self.solved }

  pub fn is_over(&self) -> bool {
    self.solved || self.attempts.len() >= self.max_attempts
  }

  pub fn remaining_attempts(&self) -> usize {
    self.max_attempts.saturating_sub(self.attempts.len())
  }

  pub fn attempts(&self) -> &[Attempt] { &self.attempts }

  /// Revealed only once the game is over.
  pub fn revealed_target(&self) -> Option<&str> {
    self.is_over().then_some(self.target_word.as_str())
  }
}

/// Ask the collaborator for a target word; fall back to the built-in list
/// when the call fails or the reply is not exactly five letters.
#[instrument(level = "info", target = "wordle", skip(generator, prompts, rng))]
pub async fn choose_target_word<R: Rng>(
  generator: &dyn TextGenerator,
  prompts: &Prompts,
  language: Language,
  level: Cefr,
  rng: &mut R,
) -> String {
  let prompt = fill_template(
    &prompts.wordle_word_template,
    &[("language", language.name_en()), ("level", level.as_str())],
  );
  match generator.generate(&prompt).await {
    Ok(reply) => {
      let word = reply.trim().to_uppercase();
      if word.chars().count() == WORD_LEN && word.chars().all(|c| c.is_ascii_alphabetic()) {
        info!(target: "wordle", %word, "Generated target word");
        return word;
      }
      warn!(target: "wordle", reply_len = reply.len(), "Generated word rejected; using fallback list");
    }
    Err(e) => {
      warn!(target: "wordle", error = %e, "Word generation failed; using fallback list");
    }
  }
  fallback_word(language, rng)
}

/// Random pick from the built-in list for `language`.
pub fn fallback_word<R: Rng>(language: Language, rng: &mut R) -> String {
  wordle_fallback_words(language)
    .choose(rng)
    .map(|w| w.to_string())
    .unwrap_or_else(|| "WORLD".to_string())
}
