//! Engine configuration (batching, timeouts, cooldowns, prompt templates) from TOML.
//!
//! See `EngineConfig` and `Prompts` for the expected schema. Every field has a
//! default, so an empty file (or no file at all) yields a working config.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::{Language, DEFAULT_BATCH_SIZE, MAX_TOTAL_COUNT};
use crate::error::{EngineError, Result};

pub const CONFIG_PATH_ENV: &str = "ENGINE_CONFIG_PATH";

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Upper bound on items per generation call.
  pub batch_size: usize,
  /// Per-batch timeout; a timed-out batch yields nothing, siblings keep going.
  pub batch_timeout_secs: u64,
  pub max_total_count: usize,
  /// Minimum gap between two mini-games offered to the same user.
  pub mini_game_cooldown_secs: u64,
  pub wordle_max_attempts: usize,
  /// Target language for seeding (`fr` or `en`).
  pub default_language: Language,
  pub prompts: Prompts,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      batch_size: DEFAULT_BATCH_SIZE,
      batch_timeout_secs: 30,
      max_total_count: MAX_TOTAL_COUNT,
      mini_game_cooldown_secs: 300,
      wordle_max_attempts: 6,
      default_language: Language::Fr,
      prompts: Prompts::default(),
    }
  }
}

impl EngineConfig {
  pub fn batch_timeout(&self) -> Duration {
    Duration::from_secs(self.batch_timeout_secs)
  }

  pub fn mini_game_cooldown(&self) -> Duration {
    Duration::from_secs(self.mini_game_cooldown_secs)
  }

  /// Parse TOML text and reject values the pipeline cannot run with.
  pub fn from_toml_str(s: &str, path: &str) -> Result<Self> {
    let cfg: EngineConfig = toml::from_str(s).map_err(|e| EngineError::Config {
      path: path.to_string(),
      message: e.to_string(),
    })?;
    if cfg.batch_size == 0 || cfg.max_total_count == 0 || cfg.wordle_max_attempts == 0 {
      return Err(EngineError::Config {
        path: path.to_string(),
        message: "batch_size, max_total_count and wordle_max_attempts must be positive".into(),
      });
    }
    Ok(cfg)
  }

  pub fn load_from_path(path: &str) -> Result<Self> {
    let s = std::fs::read_to_string(path).map_err(|e| EngineError::Config {
      path: path.to_string(),
      message: e.to_string(),
    })?;
    Self::from_toml_str(&s, path)
  }
}

/// Prompt templates for the generation collaborator.
///
/// Placeholders: `{count}`, `{level}`, `{language}`, `{code}`, `{category}`, `{focus}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub translate_pair_template: String,
  pub guess_object_template: String,
  pub fill_blank_template: String,
  pub wordle_word_template: String,
  /// Placeholders: `{task}`, `{language}`, `{question}`, `{expected}`, `{given}`.
  pub verify_answer_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      translate_pair_template: "Generate {count} Polish-{language} sentence pairs at CEFR level {level}. Category: {category}.\nReply ONLY with a JSON array:\n[{\"text_pl\": \"...\", \"text_{code}\": \"...\", \"category\": \"{category}\"}]".into(),
      guess_object_template: "Generate {count} word riddles in {language} at CEFR level {level}. The description hints at the object without naming it; the answer includes its article. Add Polish translations and a category.\nReply ONLY with a JSON array:\n[{\"description_{code}\": \"...\", \"description_pl\": \"...\", \"answer_{code}\": \"...\", \"answer_pl\": \"...\", \"category\": \"...\"}]".into(),
      fill_blank_template: "Generate {count} fill-in-the-blank exercises in {language} at CEFR level {level}. {focus}\nMark the gap as ___ and make each gap test one grammar point with an unambiguous answer.\nReply ONLY with a JSON array:\n[{\"sentence_with_blank\": \"...\", \"sentence_pl\": \"...\", \"answer\": \"...\", \"full_sentence\": \"...\", \"hint\": \"...\", \"grammar_focus\": \"verb|article|preposition|pronoun|agreement\"}]".into(),
      wordle_word_template: "Give ONE common {language} noun or adjective of EXACTLY 5 letters, level {level}, without accents. Reply with the word only, in uppercase.".into(),
      verify_answer_template: "You are an expert {language} teacher. Check whether the learner's answer is correct.\nTask: {task}\nQuestion: {question}\nExpected answer: {expected}\nLearner's answer: {given}\nAccept correct synonyms and alternative translations; ignore small differences in punctuation and letter case. Be lenient but fair.\nReply ONLY with JSON: {\"is_correct\": true or false, \"explanation\": \"short explanation in Polish, at most 2 sentences\"}".into(),
    }
  }
}

/// Load `EngineConfig` from ENGINE_CONFIG_PATH. On any IO/parse error, log and fall back to defaults.
pub fn load_engine_config_from_env() -> EngineConfig {
  let path = match std::env::var(CONFIG_PATH_ENV) {
    Ok(p) => p,
    Err(_) => return EngineConfig::default(),
  };
  match EngineConfig::load_from_path(&path) {
    Ok(cfg) => {
      info!(target: "drill_engine", %path, batch_size = cfg.batch_size, "Loaded engine config (TOML)");
      cfg
    }
    Err(e) => {
      error!(target: "drill_engine", %path, error = %e, "Failed to load engine config; using defaults");
      EngineConfig::default()
    }
  }
}
