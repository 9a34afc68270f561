//! Drill engine · content seeding driver
//!
//! Generates starter content for every exercise kind and prints a per-kind summary.
//!
//! Important env variables:
//!   OPENAI_API_KEY     : required; without it there is nothing to generate with
//!   OPENAI_BASE_URL    : default "https://api.openai.com/v1"
//!   OPENAI_MODEL       : default "gpt-4o-mini"
//!   ENGINE_CONFIG_PATH : path to TOML config (batching, timeouts, prompts)
//!   LOG_LEVEL          : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT         : "pretty" (default) or "json"

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, instrument, warn};

use drill_engine::config::load_engine_config_from_env;
use drill_engine::logic::seed_content;
use drill_engine::openai::OpenAI;
use drill_engine::seeds::SeedPlan;
use drill_engine::state::AppState;
use drill_engine::telemetry;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let config = load_engine_config_from_env();
  let state = AppState::new(&config);

  let Some(openai) = OpenAI::from_env() else {
    info!(target: "drill_engine", "OpenAI disabled (no OPENAI_API_KEY). Nothing to seed.");
    return Ok(());
  };
  info!(target: "drill_engine", base_url = %openai.base_url, model = %openai.model, "OpenAI enabled.");

  // Ctrl-C cancels batches still in flight; finished ones are kept.
  let (stop_tx, stop_rx) = watch::channel(false);
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!(target: "drill_engine", "Ctrl-C received; cancelling generation");
      let _ = stop_tx.send(true);
    }
  });

  let plan = SeedPlan { language: config.default_language, ..SeedPlan::default() };
  let summary = seed_content(&state, Arc::new(openai), &config, &plan, Some(stop_rx)).await;

  let stored: usize = summary.iter().map(|s| s.items_stored).sum();
  info!(target: "drill_engine", kinds = summary.len(), stored, "Seeding finished");
  println!("{}", serde_json::to_string_pretty(&summary)?);
  Ok(())
}
