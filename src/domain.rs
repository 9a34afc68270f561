//! Domain models: proficiency levels, target languages, content kinds,
//! canonical generated items and generation requests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, Result};

/// Hard cap on items per generation request.
pub const MAX_TOTAL_COUNT: usize = 50;
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Destination group identifier (owned by the persistence collaborator).
pub type GroupId = Uuid;

/// CEFR proficiency scale.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Cefr {
  A1,
  A2,
  B1,
  B2,
  C1,
  C2,
}

impl Cefr {
  pub const ALL: [Cefr; 6] = [Cefr::A1, Cefr::A2, Cefr::B1, Cefr::B2, Cefr::C1, Cefr::C2];

  pub fn as_str(&self) -> &'static str {
    match self {
      Cefr::A1 => "A1",
      Cefr::A2 => "A2",
      Cefr::B1 => "B1",
      Cefr::B2 => "B2",
      Cefr::C1 => "C1",
      Cefr::C2 => "C2",
    }
  }
}

impl fmt::Display for Cefr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Cefr {
  type Err = EngineError;

  fn from_str(s: &str) -> Result<Self> {
    let up = s.trim().to_ascii_uppercase();
    Cefr::ALL
      .into_iter()
      .find(|c| c.as_str() == up)
      .ok_or_else(|| EngineError::invalid(format!("unknown CEFR level '{s}'")))
  }
}

/// Language being learned. The learner's own language is the "source" side.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
  #[default]
  Fr,
  En,
}

impl Language {
  /// Lowercase code used in backend-specific field names (`text_fr`, `answer_en`).
  pub fn code(&self) -> &'static str {
    match self {
      Language::Fr => "fr",
      Language::En => "en",
    }
  }

  pub fn name_en(&self) -> &'static str {
    match self {
      Language::Fr => "French",
      Language::En => "English",
    }
  }
}

impl FromStr for Language {
  type Err = EngineError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "fr" | "french" => Ok(Language::Fr),
      "en" | "english" => Ok(Language::En),
      other => Err(EngineError::invalid(format!("unknown language '{other}'"))),
    }
  }
}

/// Exercise type a generation request produces.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
  /// Sentence pair, learner translates in either direction.
  TranslatePair,
  /// Riddle: description in the target language, learner names the object.
  GuessObject,
  /// Sentence with a `___` gap testing one grammar point.
  FillBlank,
}

impl ContentKind {
  pub const ALL: [ContentKind; 3] =
    [ContentKind::TranslatePair, ContentKind::GuessObject, ContentKind::FillBlank];

  pub fn label(&self) -> &'static str {
    match self {
      ContentKind::TranslatePair => "translate",
      ContentKind::GuessObject => "guess-object",
      ContentKind::FillBlank => "fill-blank",
    }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranslatePair {
  pub text_source: String,
  pub text_target: String,
  pub category: String,
  /// Accepted answers besides `text_target`, added after verification.
  #[serde(default, skip_serializing_if = "Vec::is_empty")] pub alternative_targets: Vec<String>,
  /// Accepted answers besides `text_source` when translating back.
  #[serde(default, skip_serializing_if = "Vec::is_empty")] pub alternative_sources: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuessObject {
  pub description_target: String,
  #[serde(default)] pub description_source: Option<String>,
  pub answer_target: String,
  #[serde(default)] pub answer_source: Option<String>,
  #[serde(default)] pub category: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FillBlank {
  pub sentence_with_blank: String,
  #[serde(default)] pub sentence_source: Option<String>,
  pub answer: String,
  #[serde(default)] pub full_sentence: String,
  #[serde(default)] pub hint: Option<String>,
  #[serde(default)] pub grammar_focus: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")] pub alternative_answers: Vec<String>,
}

/// A generated record after every backend-specific key variant has been resolved.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CanonicalItem {
  TranslatePair(TranslatePair),
  GuessObject(GuessObject),
  FillBlank(FillBlank),
}

impl CanonicalItem {
  pub fn kind(&self) -> ContentKind {
    match self {
      CanonicalItem::TranslatePair(_) => ContentKind::TranslatePair,
      CanonicalItem::GuessObject(_) => ContentKind::GuessObject,
      CanonicalItem::FillBlank(_) => ContentKind::FillBlank,
    }
  }

  /// Question shown and answer expected for `task`; `None` when the task does not apply.
  pub fn question_and_answer(&self, task: AnswerTask) -> Option<(&str, &str)> {
    match (self, task) {
      (CanonicalItem::TranslatePair(p), AnswerTask::TranslateToTarget) => Some((&p.text_source, &p.text_target)),
      (CanonicalItem::TranslatePair(p), AnswerTask::TranslateToSource) => Some((&p.text_target, &p.text_source)),
      (CanonicalItem::FillBlank(f), AnswerTask::FillBlank) => Some((&f.sentence_with_blank, &f.answer)),
      _ => None,
    }
  }

  /// Record `answer` as accepted for `task`. Returns `Ok(false)` when it is
  /// already known (trimmed, case-insensitive), including the primary answer.
  pub fn add_alternative(&mut self, task: AnswerTask, answer: &str) -> Result<bool> {
    let answer = answer.trim();
    if answer.is_empty() {
      return Err(EngineError::invalid("alternative answer is empty"));
    }
    let (primary, list) = match (self, task) {
      (CanonicalItem::TranslatePair(p), AnswerTask::TranslateToTarget) => (&p.text_target, &mut p.alternative_targets),
      (CanonicalItem::TranslatePair(p), AnswerTask::TranslateToSource) => (&p.text_source, &mut p.alternative_sources),
      (CanonicalItem::FillBlank(f), AnswerTask::FillBlank) => (&f.answer, &mut f.alternative_answers),
      (item, task) => {
        return Err(EngineError::invalid(format!("{task:?} does not apply to {:?} items", item.kind())));
      }
    };
    let folded = answer.to_lowercase();
    let known = std::iter::once(primary).chain(list.iter()).any(|a| a.trim().to_lowercase() == folded);
    if known {
      return Ok(false);
    }
    list.push(answer.to_string());
    Ok(true)
  }
}

/// Which way the learner answered an item.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnswerTask {
  /// Prompt in the learner's language, answer in the target language.
  #[serde(alias = "translate_pl_to_target", alias = "translate_pl_fr")]
  TranslateToTarget,
  #[serde(alias = "translate_target_to_pl", alias = "translate_fr_pl")]
  TranslateToSource,
  FillBlank,
}

impl AnswerTask {
  pub fn describe(&self, language: Language) -> String {
    match self {
      AnswerTask::TranslateToTarget => format!("translation from Polish into {}", language.name_en()),
      AnswerTask::TranslateToSource => format!("translation from {} into Polish", language.name_en()),
      AnswerTask::FillBlank => format!("filling the gap in a {} sentence", language.name_en()),
    }
  }
}

/// Items destined for one group.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct GroupAssignment {
  pub group_id: GroupId,
  pub items: Vec<CanonicalItem>,
}

/// A request for `total_count` items of one kind, split into batches of at most `batch_size`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
  pub content_kind: ContentKind,
  pub proficiency_level: Cefr,
  pub total_count: usize,
  #[serde(default)] pub category: Option<String>,
  #[serde(default)] pub grammar_focus: Option<String>,
  #[serde(default)] pub language: Language,
  #[serde(default = "default_batch_size")] pub batch_size: usize,
}

fn default_batch_size() -> usize { DEFAULT_BATCH_SIZE }

impl GenerationRequest {
  /// Validated constructor; rejects `total_count` outside `1..=MAX_TOTAL_COUNT`.
  pub fn new(
    content_kind: ContentKind,
    proficiency_level: Cefr,
    total_count: usize,
    language: Language,
  ) -> Result<Self> {
    let req = Self {
      content_kind,
      proficiency_level,
      total_count,
      category: None,
      grammar_focus: None,
      language,
      batch_size: DEFAULT_BATCH_SIZE,
    };
    req.validate(MAX_TOTAL_COUNT)?;
    Ok(req)
  }

  pub fn with_category(mut self, category: impl Into<String>) -> Self {
    self.category = Some(category.into());
    self
  }

  pub fn with_grammar_focus(mut self, focus: impl Into<String>) -> Self {
    self.grammar_focus = Some(focus.into());
    self
  }

  pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self> {
    if batch_size == 0 {
      return Err(EngineError::invalid("batch_size must be positive"));
    }
    self.batch_size = batch_size;
    Ok(self)
  }

  /// Check count bounds; also used for requests that arrive deserialized.
  pub fn validate(&self, max_total_count: usize) -> Result<()> {
    if self.total_count == 0 {
      return Err(EngineError::invalid("total_count must be positive"));
    }
    if self.total_count > max_total_count {
      return Err(EngineError::invalid(format!(
        "total_count {} exceeds maximum of {}",
        self.total_count, max_total_count
      )));
    }
    if self.batch_size == 0 {
      return Err(EngineError::invalid("batch_size must be positive"));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cefr_parses_case_insensitively() {
    assert_eq!("b2".parse::<Cefr>().unwrap(), Cefr::B2);
    assert_eq!(" C1 ".parse::<Cefr>().unwrap(), Cefr::C1);
    assert!("D1".parse::<Cefr>().is_err());
  }

  #[test]
  fn request_rejects_bad_counts() {
    assert!(GenerationRequest::new(ContentKind::TranslatePair, Cefr::A1, 0, Language::Fr).is_err());
    assert!(GenerationRequest::new(ContentKind::TranslatePair, Cefr::A1, 51, Language::Fr).is_err());
    let req = GenerationRequest::new(ContentKind::FillBlank, Cefr::B1, 50, Language::En).unwrap();
    assert_eq!(req.batch_size, DEFAULT_BATCH_SIZE);
    assert!(req.with_batch_size(0).is_err());
  }

  #[test]
  fn canonical_item_serializes_with_kind_tag() {
    let item = CanonicalItem::TranslatePair(TranslatePair {
      text_source: "kot".into(),
      text_target: "chat".into(),
      category: "mixed".into(),
      alternative_targets: vec![],
      alternative_sources: vec![],
    });
    let v = serde_json::to_value(&item).unwrap();
    assert_eq!(v["kind"], "translate_pair");
    assert_eq!(v["text_target"], "chat");
    assert!(v.get("alternative_targets").is_none());
  }

  #[test]
  fn alternatives_are_deduplicated_case_insensitively() {
    let mut item = CanonicalItem::TranslatePair(TranslatePair {
      text_source: "Dzień dobry".into(),
      text_target: "Bonjour".into(),
      category: "greetings".into(),
      alternative_targets: vec![],
      alternative_sources: vec![],
    });
    assert!(!item.add_alternative(AnswerTask::TranslateToTarget, " bonjour ").unwrap());
    assert!(item.add_alternative(AnswerTask::TranslateToTarget, " Salut ").unwrap());
    assert!(!item.add_alternative(AnswerTask::TranslateToTarget, "SALUT").unwrap());
    assert!(item.add_alternative(AnswerTask::TranslateToSource, "Cześć").unwrap());
    match &item {
      CanonicalItem::TranslatePair(p) => {
        assert_eq!(p.alternative_targets, vec!["Salut".to_string()]);
        assert_eq!(p.alternative_sources, vec!["Cześć".to_string()]);
      }
      _ => unreachable!(),
    }
    assert!(item.add_alternative(AnswerTask::FillBlank, "x").is_err());
    assert!(item.add_alternative(AnswerTask::TranslateToTarget, "  ").is_err());
  }

  #[test]
  fn answer_task_accepts_legacy_names() {
    let t: AnswerTask = serde_json::from_str("\"translate_fr_pl\"").unwrap();
    assert_eq!(t, AnswerTask::TranslateToSource);
    let t: AnswerTask = serde_json::from_str("\"fill_blank\"").unwrap();
    assert_eq!(t, AnswerTask::FillBlank);
  }
}
