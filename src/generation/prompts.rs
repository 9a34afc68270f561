//! Prompt construction per content kind, from the configured templates.

use crate::config::Prompts;
use crate::domain::{ContentKind, GenerationRequest};
use crate::util::fill_template;

pub const DEFAULT_CATEGORY: &str = "mixed";

/// Extra instruction for a fill-blank grammar focus; unknown focuses add nothing.
fn focus_instruction(focus: Option<&str>) -> &'static str {
  match focus {
    Some("verb") => "Focus on verbs and their forms.",
    Some("article") => "Focus on articles.",
    Some("preposition") => "Focus on prepositions.",
    Some("pronoun") => "Focus on pronouns.",
    Some("agreement") => "Focus on agreement (gender, number, participles).",
    _ => "",
  }
}

pub fn build_prompt(request: &GenerationRequest, count: usize, prompts: &Prompts) -> String {
  let tpl = match request.content_kind {
    ContentKind::TranslatePair => &prompts.translate_pair_template,
    ContentKind::GuessObject => &prompts.guess_object_template,
    ContentKind::FillBlank => &prompts.fill_blank_template,
  };
  let count = count.to_string();
  let category = request.category.as_deref().unwrap_or(DEFAULT_CATEGORY);
  fill_template(
    tpl,
    &[
      ("count", &count),
      ("level", request.proficiency_level.as_str()),
      ("language", request.language.name_en()),
      ("code", request.language.code()),
      ("category", category),
      ("focus", focus_instruction(request.grammar_focus.as_deref())),
    ],
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Cefr, Language};

  #[test]
  fn translate_prompt_names_language_coded_field() {
    let req = GenerationRequest::new(ContentKind::TranslatePair, Cefr::B1, 5, Language::Fr)
      .unwrap()
      .with_category("verbs");
    let p = build_prompt(&req, 5, &Prompts::default());
    assert!(p.contains("text_fr"));
    assert!(p.contains("verbs"));
    assert!(!p.contains("{code}"));
  }

  #[test]
  fn fill_blank_prompt_includes_focus() {
    let req = GenerationRequest::new(ContentKind::FillBlank, Cefr::C1, 3, Language::En)
      .unwrap()
      .with_grammar_focus("article");
    let p = build_prompt(&req, 3, &Prompts::default());
    assert!(p.contains("Focus on articles."));
    assert!(!p.contains("{focus}"));
  }
}
