//! Turning raw model text into canonical items.
//!
//! Steps per successful batch: strip markdown fences, parse a JSON array,
//! resolve backend-specific key variants onto canonical keys, then extract a
//! typed `CanonicalItem`. A batch that does not parse contributes nothing;
//! objects missing mandatory fields are dropped. Nothing here returns an error.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::{
  CanonicalItem, ContentKind, FillBlank, GuessObject, Language, TranslatePair,
};
use crate::generation::dispatch::{BatchOutcome, RawBatchResult};
use crate::generation::prompts::DEFAULT_CATEGORY;
use crate::util::{strip_code_fences, trunc_for_log};

/// Learner's own language; models usually label it with this code.
const SOURCE_CODE: &str = "pl";

/// Language codes tried, in order, after the requested one. Riddles only
/// fall back to French-coded keys.
fn fallback_codes(kind: ContentKind) -> &'static [&'static str] {
  match kind {
    ContentKind::GuessObject => &["fr"],
    ContentKind::TranslatePair | ContentKind::FillBlank => &["fr", "en"],
  }
}

type Record = Map<String, Value>;

/// Flatten every successful batch into canonical items, preserving batch order.
pub fn normalize_results(
  results: &[RawBatchResult],
  kind: ContentKind,
  language: Language,
  default_category: Option<&str>,
) -> Vec<CanonicalItem> {
  results
    .iter()
    .filter_map(|r| match &r.outcome {
      BatchOutcome::Success(text) => Some((r.batch_index, text)),
      BatchOutcome::Failure(_) => None,
    })
    .flat_map(|(index, text)| {
      let items = normalize_batch(text, kind, language, default_category);
      debug!(target: "generation", batch = index, items = items.len(), "Batch normalized");
      items
    })
    .collect()
}

/// Normalize one batch of raw text. Unparseable text yields an empty list.
pub fn normalize_batch(
  text: &str,
  kind: ContentKind,
  language: Language,
  default_category: Option<&str>,
) -> Vec<CanonicalItem> {
  let cleaned = strip_code_fences(text);
  let values: Vec<Value> = match serde_json::from_str(cleaned) {
    Ok(Value::Array(values)) => values,
    Ok(other) => {
      warn!(target: "generation", got = %json_type(&other), "Batch is not a JSON array; dropping");
      return Vec::new();
    }
    Err(e) => {
      warn!(target: "generation", error = %e, payload = %trunc_for_log(cleaned, 120), "Batch JSON parse failed; dropping");
      return Vec::new();
    }
  };

  let total = values.len();
  let items: Vec<CanonicalItem> = values
    .into_iter()
    .filter_map(|v| match v {
      Value::Object(mut record) => {
        canonicalize_record(&mut record, kind, language);
        extract_item(&record, kind, default_category)
      }
      _ => None,
    })
    .collect();

  if items.len() < total {
    debug!(target: "generation", dropped = total - items.len(), kept = items.len(), "Dropped incomplete objects");
  }
  items
}

/// Write canonical keys into `record`, resolving variants.
///
/// An existing canonical key always wins; otherwise the language-coded variant
/// for the requested language, then any other known code. Running this twice
/// changes nothing the second time.
pub fn canonicalize_record(record: &mut Record, kind: ContentKind, language: Language) {
  match kind {
    ContentKind::TranslatePair => {
      resolve_target(record, "text", kind, language);
      resolve_source(record, "text");
    }
    ContentKind::GuessObject => {
      resolve_target(record, "description", kind, language);
      resolve_target(record, "answer", kind, language);
      resolve_source(record, "description");
      resolve_source(record, "answer");
    }
    ContentKind::FillBlank => {
      resolve_source(record, "sentence");
    }
  }
}

fn resolve_target(record: &mut Record, base: &str, kind: ContentKind, language: Language) {
  let canonical = format!("{base}_target");
  if record.contains_key(&canonical) {
    return;
  }
  let candidates = std::iter::once(language.code()).chain(fallback_codes(kind).iter().copied());
  for code in candidates {
    if let Some(v) = record.get(&format!("{base}_{code}")).cloned() {
      record.insert(canonical, v);
      return;
    }
  }
}

fn resolve_source(record: &mut Record, base: &str) {
  let canonical = format!("{base}_source");
  if record.contains_key(&canonical) {
    return;
  }
  if let Some(v) = record.get(&format!("{base}_{SOURCE_CODE}")).cloned() {
    record.insert(canonical, v);
  }
}

/// Typed view of a canonicalized record; `None` when a mandatory field is missing or blank.
/// Non-string values count as missing.
pub fn extract_item(record: &Record, kind: ContentKind, default_category: Option<&str>) -> Option<CanonicalItem> {
  match kind {
    ContentKind::TranslatePair => Some(CanonicalItem::TranslatePair(TranslatePair {
      text_source: field(record, "text_source")?,
      text_target: field(record, "text_target")?,
      category: field(record, "category")
        .or_else(|| default_category.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
      alternative_targets: string_list(record, "alternative_targets"),
      alternative_sources: string_list(record, "alternative_sources"),
    })),
    ContentKind::GuessObject => Some(CanonicalItem::GuessObject(GuessObject {
      description_target: field(record, "description_target")?,
      description_source: field(record, "description_source"),
      answer_target: field(record, "answer_target")?,
      answer_source: field(record, "answer_source"),
      category: field(record, "category"),
    })),
    ContentKind::FillBlank => Some(CanonicalItem::FillBlank(FillBlank {
      sentence_with_blank: field(record, "sentence_with_blank")?,
      sentence_source: field(record, "sentence_source"),
      answer: field(record, "answer")?,
      full_sentence: field(record, "full_sentence").unwrap_or_default(),
      hint: field(record, "hint"),
      grammar_focus: field(record, "grammar_focus"),
      alternative_answers: string_list(record, "alternative_answers"),
    })),
  }
}

/// Non-blank strings of an optional array field; anything else is ignored.
fn string_list(record: &Record, key: &str) -> Vec<String> {
  record
    .get(key)
    .and_then(Value::as_array)
    .map(|values| {
      values
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
    })
    .unwrap_or_default()
}

fn field(record: &Record, key: &str) -> Option<String> {
  record
    .get(key)
    .and_then(Value::as_str)
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
}

fn json_type(v: &Value) -> &'static str {
  match v {
    Value::Null => "null",
    Value::Bool(_) => "bool",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}
