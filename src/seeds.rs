//! Built-in defaults: the startup seeding plan and Wordle fallback words.

use crate::domain::{Cefr, ContentKind, Language};

/// What to generate when seeding an empty store.
#[derive(Clone, Debug)]
pub struct SeedPlan {
  pub language: Language,
  pub level: Cefr,
  pub kinds: Vec<ContentKind>,
  pub groups_per_kind: usize,
  pub items_per_group: usize,
}

impl Default for SeedPlan {
  fn default() -> Self {
    Self {
      language: Language::default(),
      level: Cefr::B1,
      kinds: ContentKind::ALL.to_vec(),
      groups_per_kind: 2,
      items_per_group: 20,
    }
  }
}

impl SeedPlan {
  pub fn group_names(&self, kind: ContentKind) -> Vec<String> {
    (1..=self.groups_per_kind)
      .map(|n| format!("{} · starter set {n}", kind.label()))
      .collect()
  }

  pub fn total_per_kind(&self) -> usize {
    self.groups_per_kind * self.items_per_group
  }
}

const FALLBACK_FR: &[&str] = &[
  "POMME", "LIVRE", "CHIEN", "TABLE", "JOUER", "AIMER", "VIVRE", "ROUGE", "VERTE", "GRAND",
  "PETIT", "MONDE", "TEMPS", "PLAGE", "FLEUR", "ARBRE", "NEIGE", "FROID", "CHAUD", "HOMME",
];

const FALLBACK_EN: &[&str] = &[
  "APPLE", "HOUSE", "WATER", "LIGHT", "HORSE", "CLOUD", "BREAD", "STONE", "GREEN", "WHITE",
];

/// Five-letter uppercase ASCII words used when the collaborator cannot supply one.
pub fn wordle_fallback_words(language: Language) -> &'static [&'static str] {
  match language {
    Language::Fr => FALLBACK_FR,
    Language::En => FALLBACK_EN,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fallback_words_are_playable() {
    for lang in [Language::Fr, Language::En] {
      let words = wordle_fallback_words(lang);
      assert!(!words.is_empty());
      for w in words {
        assert_eq!(w.len(), 5, "{w}");
        assert!(w.chars().all(|c| c.is_ascii_uppercase()), "{w}");
      }
    }
  }

  #[test]
  fn default_plan_fits_one_request_per_kind() {
    let plan = SeedPlan::default();
    assert!(plan.total_per_kind() <= crate::domain::MAX_TOTAL_COUNT);
    assert_eq!(plan.group_names(ContentKind::FillBlank).len(), 2);
  }
}
