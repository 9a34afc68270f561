//! Second-opinion answer checking: the generation collaborator judges an
//! answer that did not match the stored one exactly.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::Prompts;
use crate::domain::{AnswerTask, Language};
use crate::error::{EngineError, GenerationError, Result};
use crate::generation::TextGenerator;
use crate::util::{fill_template, strip_code_fences, trunc_for_log};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerVerdict {
  #[serde(default)]
  pub is_correct: bool,
  #[serde(default = "no_explanation")]
  pub explanation: String,
}

fn no_explanation() -> String {
  "No explanation given.".to_string()
}

/// Ask the collaborator whether `given` answers `question` (expected: `expected`).
#[instrument(
  level = "info",
  target = "scoring",
  skip(generator, prompts, question, expected, given),
  fields(?task, ?language, given_len = given.len())
)]
pub async fn verify_answer(
  generator: &dyn TextGenerator,
  prompts: &Prompts,
  task: AnswerTask,
  language: Language,
  question: &str,
  expected: &str,
  given: &str,
) -> Result<AnswerVerdict> {
  if given.trim().is_empty() {
    return Err(EngineError::invalid("answer is empty"));
  }
  let description = task.describe(language);
  let prompt = fill_template(
    &prompts.verify_answer_template,
    &[
      ("task", &description),
      ("language", language.name_en()),
      ("question", question),
      ("expected", expected),
      ("given", given.trim()),
    ],
  );

  let reply = generator.generate(&prompt).await?;
  let verdict = parse_verdict(&reply)?;
  info!(target: "scoring", correct = verdict.is_correct, "Answer verified");
  Ok(verdict)
}

/// Parse the collaborator's JSON verdict, tolerating markdown fences.
pub fn parse_verdict(reply: &str) -> Result<AnswerVerdict> {
  serde_json::from_str(strip_code_fences(reply)).map_err(|e| {
    warn!(target: "scoring", error = %e, reply = %trunc_for_log(reply, 120), "Verdict did not parse");
    EngineError::Generation(GenerationError::Malformed(e.to_string()))
  })
}
